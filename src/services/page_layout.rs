//! Rebuilds the visual lines of a page from its content stream.
//!
//! Every text-showing operator becomes a run anchored at its text-space
//! origin. Runs sharing a baseline form a line; within a line, runs separated
//! by a horizontal gap wider than `CELL_GAP` font sizes become separate
//! cells joined by a tab. Cells drawn with their own `Tm`/`Td` move therefore
//! come out as `Item\tQty\tPrice`, which the table detector reads as a row.
//!
//! Glyph widths are estimated, not read from the font program.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};

/// Estimated advance of one glyph, in font sizes.
const AVG_GLYPH_WIDTH: f32 = 0.55;
/// Horizontal gap, in font sizes, that separates two cells.
const CELL_GAP: f32 = 1.5;
/// `TJ` adjustments are in thousandths of a font size.
const TJ_UNIT: f32 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
struct TextRun {
    x: f32,
    y: f32,
    size: f32,
    text: String,
}

impl TextRun {
    fn end_x(&self) -> f32 {
        self.x + self.text.chars().count() as f32 * self.size * AVG_GLYPH_WIDTH
    }
}

/// Text matrix `[a b c d e f]`, restricted to what positioning needs.
#[derive(Debug, Clone, Copy)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 };

    fn translate(self, tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: self.e + tx * self.a + ty * self.c,
            f: self.f + tx * self.b + ty * self.d,
            ..self
        }
    }
}

#[derive(Debug)]
struct TextState {
    line_matrix: Matrix,
    matrix: Matrix,
    font_size: f32,
    leading: f32,
    runs: Vec<TextRun>,
}

impl TextState {
    fn new() -> Self {
        Self {
            line_matrix: Matrix::IDENTITY,
            matrix: Matrix::IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            runs: Vec::new(),
        }
    }

    fn effective_size(&self) -> f32 {
        let scale = (self.matrix.a * self.matrix.a + self.matrix.b * self.matrix.b).sqrt();
        (self.font_size * scale).abs().max(1.0)
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = self.line_matrix.translate(tx, ty);
        self.matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, bytes: &[u8]) {
        let text = decode_string(bytes);
        let advance = text.chars().count() as f32 * self.font_size * AVG_GLYPH_WIDTH;
        if !text.trim().is_empty() {
            self.runs.push(TextRun {
                x: self.matrix.e,
                y: self.matrix.f,
                size: self.effective_size(),
                text,
            });
        }
        self.matrix = self.matrix.translate(advance, 0.0);
    }

    fn apply(&mut self, op: &Operation) {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                self.line_matrix = Matrix::IDENTITY;
                self.matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = operands.get(1).and_then(number) {
                    self.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = operands.first().and_then(number) {
                    self.leading = leading;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (
                    operands.first().and_then(number),
                    operands.get(1).and_then(number),
                ) {
                    if op.operator == "TD" {
                        self.leading = -ty;
                    }
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                let values: Vec<f32> = operands.iter().filter_map(number).collect();
                if let [a, b, c, d, e, f] = values[..] {
                    self.line_matrix = Matrix { a, b, c, d, e, f };
                    self.matrix = self.line_matrix;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(bytes);
                }
            }
            "\"" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => self.show(bytes),
                            other => {
                                if let Some(adjust) = number(other) {
                                    let shift = -adjust / TJ_UNIT * self.font_size;
                                    self.matrix = self.matrix.translate(shift, 0.0);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

/// Lines of page `page_id`, top to bottom, with cells separated by tabs.
pub fn page_lines(document: &Document, page_id: ObjectId) -> lopdf::Result<Vec<String>> {
    let content = document.get_and_decode_page_content(page_id)?;
    Ok(layout_lines(&content))
}

fn layout_lines(content: &Content) -> Vec<String> {
    let mut state = TextState::new();
    for op in &content.operations {
        state.apply(op);
    }
    group_lines(state.runs)
}

fn group_lines(mut runs: Vec<TextRun>) -> Vec<String> {
    runs.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x.total_cmp(&b.x)));

    let mut lines: Vec<Vec<TextRun>> = Vec::new();
    for run in runs {
        match lines.last_mut() {
            Some(line) if (line[0].y - run.y).abs() <= line[0].size.min(run.size) * 0.5 => {
                line.push(run)
            }
            _ => lines.push(vec![run]),
        }
    }

    lines
        .into_iter()
        .map(|mut line| {
            line.sort_by(|a, b| a.x.total_cmp(&b.x));
            join_cells(&line)
        })
        .collect()
}

fn join_cells(line: &[TextRun]) -> String {
    let mut out = String::new();
    let mut previous: Option<&TextRun> = None;
    for run in line {
        if let Some(prev) = previous {
            let gap = run.x - prev.end_x();
            out.push(if gap > prev.size.max(run.size) * CELL_GAP { '\t' } else { ' ' });
        }
        out.push_str(run.text.trim());
        previous = Some(run);
    }
    out
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

// Simple fonts are close enough to Latin-1 for cell text; UTF-16BE strings
// carry a byte order mark.
fn decode_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}
