//! Worksheet rendering to PDF: a title page, the exercise grid, and a
//! solutions section, on A5 portrait pages.
//!
//! Built-in fonts only, so the output needs no embedded font files.
//! Courier is effectively the layout engine here: every glyph advances
//! 0.6 em, which makes right-alignment a multiplication.

use printpdf::{
  BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::domain::{Exercise, Worksheet};

const PAGE_W_MM: f32 = 148.0;
const PAGE_H_MM: f32 = 210.0;
const MARGIN_MM: f32 = 10.0;

/// One text row inside an exercise box.
const LINE_MM: f32 = 6.0;
/// Three rows: operand, operand, answer line.
const BOX_MM: f32 = 18.0;
const ROW_GAP_MM: f32 = 4.0;
/// Narrow column holding the exercise number and the operator glyph.
const NUM_COL_MM: f32 = 12.0;

const TITLE_PT: f32 = 28.0;
const BYLINE_PT: f32 = 20.0;
const HEADING_PT: f32 = 18.0;
const CATEGORY_PT: f32 = 16.0;
const FIGURE_PT: f32 = 12.0;
const INDEX_PT: f32 = 8.0;

const PT_TO_MM: f32 = 0.352_778;

struct Fonts {
  bold: IndirectFontRef,
  italic: IndirectFontRef,
  mono: IndirectFontRef,
}

/// Width of Courier text: every glyph advances 0.6 em.
fn courier_width_mm(chars: usize, size_pt: f32) -> f32 {
  chars as f32 * 0.6 * size_pt * PT_TO_MM
}

/// Baseline for text `row` rows deep inside a box whose top edge sits
/// `y_top` millimetres below the top of the page.
fn baseline(y_top: f32, row: usize) -> Mm {
  Mm(PAGE_H_MM - y_top - (row as f32 + 0.75) * LINE_MM)
}

/// Rough centring for Helvetica headings; close enough for titles.
fn centered_x(text: &str, size_pt: f32) -> Mm {
  let w = text.chars().count() as f32 * 0.5 * size_pt * PT_TO_MM;
  Mm(((PAGE_W_MM - w) / 2.0).max(MARGIN_MM))
}

/// Render the worksheet: title page, one questions section, one solutions
/// section. Returns the finished document bytes.
pub fn render_worksheet_pdf(worksheet: &Worksheet) -> Result<Vec<u8>, String> {
  let (doc, title_page, title_layer) =
    PdfDocument::new("Math Exercises", Mm(PAGE_W_MM), Mm(PAGE_H_MM), "title");
  let fonts = Fonts {
    bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| e.to_string())?,
    italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(|e| e.to_string())?,
    mono: doc.add_builtin_font(BuiltinFont::Courier).map_err(|e| e.to_string())?,
  };

  let layer = doc.get_page(title_page).get_layer(title_layer);
  layer.use_text(
    "Math Exercises",
    TITLE_PT,
    centered_x("Math Exercises", TITLE_PT),
    Mm(PAGE_H_MM / 2.0 + 12.0),
    &fonts.bold,
  );
  layer.use_text(
    "by MathEx",
    BYLINE_PT,
    centered_x("by MathEx", BYLINE_PT),
    Mm(PAGE_H_MM / 2.0 - 4.0),
    &fonts.italic,
  );

  render_part(&doc, &fonts, worksheet, false, "Questions");
  render_part(&doc, &fonts, worksheet, true, "Solutions");

  doc.save_to_bytes().map_err(|e| e.to_string())
}

/// Lay out every category as a grid of exercise boxes. Each category
/// starts on a fresh page; a category that overflows continues on the
/// next page without repeating its heading.
fn render_part(
  doc: &PdfDocumentReference,
  fonts: &Fonts,
  worksheet: &Worksheet,
  with_solutions: bool,
  title: &str,
) {
  let columns = worksheet.columns.max(1) as usize;
  let col_width = (PAGE_W_MM - 2.0 * MARGIN_MM) / columns as f32;

  let (page, layer_idx) = doc.add_page(Mm(PAGE_W_MM), Mm(PAGE_H_MM), "grid");
  let mut layer = doc.get_page(page).get_layer(layer_idx);
  layer.use_text(
    title,
    HEADING_PT,
    centered_x(title, HEADING_PT),
    Mm(PAGE_H_MM - MARGIN_MM - 7.0),
    &fonts.bold,
  );
  let mut y_top = MARGIN_MM + 15.0;

  for (ci, category) in worksheet.categories.iter().enumerate() {
    if ci > 0 {
      let (p, l) = doc.add_page(Mm(PAGE_W_MM), Mm(PAGE_H_MM), "grid");
      layer = doc.get_page(p).get_layer(l);
      y_top = MARGIN_MM;
    }

    layer.use_text(
      category.op.label(),
      CATEGORY_PT,
      Mm(MARGIN_MM),
      Mm(PAGE_H_MM - y_top - 7.0),
      &fonts.bold,
    );
    y_top += 10.0;

    for (ei, ex) in category.exercises.iter().enumerate() {
      let col = ei % columns;
      if col == 0 && ei > 0 {
        y_top += BOX_MM + ROW_GAP_MM;
      }
      if col == 0 && y_top + BOX_MM > PAGE_H_MM - MARGIN_MM {
        let (p, l) = doc.add_page(Mm(PAGE_W_MM), Mm(PAGE_H_MM), "grid");
        layer = doc.get_page(p).get_layer(l);
        y_top = MARGIN_MM;
      }
      let x_left = MARGIN_MM + col as f32 * col_width;
      draw_exercise_box(&layer, fonts, ex, ei + 1, x_left, y_top, col_width, with_solutions);
    }
    y_top += BOX_MM + ROW_GAP_MM;
  }
}

/// One exercise box: the number and operator in a narrow left column,
/// operands and the answer line right-aligned beside them.
#[allow(clippy::too_many_arguments)]
fn draw_exercise_box(
  layer: &PdfLayerReference,
  fonts: &Fonts,
  ex: &Exercise,
  number: usize,
  x_left: f32,
  y_top: f32,
  col_width: f32,
  with_solution: bool,
) {
  let right_edge = x_left + col_width;
  let num_edge = x_left + NUM_COL_MM;

  let label = format!("{}.", number);
  layer.use_text(
    label.as_str(),
    INDEX_PT,
    Mm(num_edge - courier_width_mm(label.chars().count(), INDEX_PT) - 1.0),
    baseline(y_top, 0),
    &fonts.mono,
  );
  let a = ex.a.to_string();
  layer.use_text(
    a.as_str(),
    FIGURE_PT,
    Mm(right_edge - courier_width_mm(a.chars().count(), FIGURE_PT) - 1.0),
    baseline(y_top, 0),
    &fonts.mono,
  );

  layer.use_text(
    ex.op.symbol(),
    FIGURE_PT,
    Mm(num_edge - courier_width_mm(1, FIGURE_PT) - 1.0),
    baseline(y_top, 1),
    &fonts.mono,
  );
  let b = ex.b.to_string();
  layer.use_text(
    b.as_str(),
    FIGURE_PT,
    Mm(right_edge - courier_width_mm(b.chars().count(), FIGURE_PT) - 1.0),
    baseline(y_top, 1),
    &fonts.mono,
  );

  layer.use_text(
    "=",
    FIGURE_PT,
    Mm(num_edge - courier_width_mm(1, FIGURE_PT) - 1.0),
    baseline(y_top, 2),
    &fonts.mono,
  );
  let tail = if with_solution {
    ex.result.to_string()
  } else {
    "_".repeat(ex.result_len().max(3))
  };
  layer.use_text(
    tail.as_str(),
    FIGURE_PT,
    Mm(right_edge - courier_width_mm(tail.chars().count(), FIGURE_PT) - 1.0),
    baseline(y_top, 2),
    &fonts.mono,
  );
}
