//! Bitmap rendering of a report
//!
//! Produces a single tall RGB image of the visible blocks using a built-in
//! 5x7 glyph font. Map blocks are skipped entirely. Layout is computed
//! first as a list of draw operations, then painted.

use image::{Rgb, RgbImage};
use integrity_common::{Error, Result};

use super::{BlockKind, Metric, ReportDocument, SignatureLine, Table};

const MARGIN: u32 = 24;
const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
const ADVANCE: u32 = GLYPH_W + 1;
const BLOCK_GAP: u32 = 14;
const TABLE_ROW_H: u32 = 16;
const METRIC_BOX_W: u32 = 176;
const METRIC_BOX_H: u32 = 50;

/// Refuse to allocate bitmaps taller than this
pub const MAX_HEIGHT_PX: u32 = 200_000;

const BLACK: Rgb<u8> = Rgb([20, 20, 20]);
const GREY: Rgb<u8> = Rgb([110, 110, 110]);
const RULE: Rgb<u8> = Rgb([200, 200, 200]);
const HEADER_FILL: Rgb<u8> = Rgb([232, 236, 241]);
const BOX_FILL: Rgb<u8> = Rgb([245, 247, 250]);
const ACCENT: Rgb<u8> = Rgb([30, 64, 120]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Fill { x: u32, y: u32, w: u32, h: u32, color: Rgb<u8> },
    Text { x: u32, y: u32, scale: u32, text: String, color: Rgb<u8> },
}

struct Layout {
    width: u32,
    y: u32,
    ops: Vec<Op>,
}

impl Layout {
    fn new(width: u32) -> Self {
        Self {
            width,
            y: MARGIN,
            ops: Vec::new(),
        }
    }

    fn inner_width(&self) -> u32 {
        self.width - 2 * MARGIN
    }

    fn fill(&mut self, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
        self.ops.push(Op::Fill { x, y, w, h, color });
    }

    fn text(&mut self, x: u32, y: u32, scale: u32, text: impl Into<String>, color: Rgb<u8>) {
        self.ops.push(Op::Text {
            x,
            y,
            scale,
            text: text.into(),
            color,
        });
    }

    /// Word-wrapped text starting at the current line
    fn wrapped(&mut self, text: &str, scale: u32, color: Rgb<u8>) {
        let max_chars = (self.inner_width() / (ADVANCE * scale)).max(1) as usize;
        let line_h = (GLYPH_H + 3) * scale;
        for line in wrap(text, max_chars) {
            let y = self.y;
            self.text(MARGIN, y, scale, line, color);
            self.y += line_h;
        }
    }

    fn heading(&mut self, level: u8, text: &str) {
        let scale = if level <= 1 { 3 } else { 2 };
        self.wrapped(text, scale, ACCENT);
        if level <= 2 {
            let (y, w) = (self.y, self.inner_width());
            self.fill(MARGIN, y, w, 1, ACCENT);
            self.y += 4;
        }
    }

    fn metrics(&mut self, metrics: &[Metric]) {
        let per_row = (self.inner_width() / (METRIC_BOX_W + 8)).max(1);
        for row in metrics.chunks(per_row as usize) {
            let top = self.y;
            for (i, metric) in row.iter().enumerate() {
                let x = MARGIN + i as u32 * (METRIC_BOX_W + 8);
                self.fill(x, top, METRIC_BOX_W, METRIC_BOX_H, BOX_FILL);
                self.fill(x, top, 3, METRIC_BOX_H, ACCENT);
                let label_chars = ((METRIC_BOX_W - 16) / ADVANCE) as usize;
                let value_chars = ((METRIC_BOX_W - 16) / (ADVANCE * 2)) as usize;
                self.text(x + 10, top + 8, 1, truncate(&metric.label, label_chars), GREY);
                self.text(x + 10, top + 24, 2, truncate(&metric.value, value_chars), BLACK);
            }
            self.y = top + METRIC_BOX_H + 8;
        }
    }

    fn table(&mut self, table: &Table) {
        if table.columns.is_empty() {
            return;
        }
        let inner = self.inner_width();
        let total: f64 = table.columns.iter().map(|c| c.width.max(1.0)).sum();
        let mut xs = Vec::with_capacity(table.columns.len());
        let mut x = MARGIN;
        for col in &table.columns {
            let w = ((col.width.max(1.0) / total) * inner as f64).floor() as u32;
            xs.push((x, w));
            x += w;
        }

        let top = self.y;
        self.fill(MARGIN, top, inner, TABLE_ROW_H, HEADER_FILL);
        for ((x, w), col) in xs.iter().zip(&table.columns) {
            let chars = (w.saturating_sub(6) / ADVANCE) as usize;
            self.text(x + 3, top + 5, 1, truncate(&col.header, chars), BLACK);
        }
        self.y = top + TABLE_ROW_H;

        for row in &table.rows {
            let y = self.y;
            for ((x, w), cell) in xs.iter().zip(row) {
                let chars = (w.saturating_sub(6) / ADVANCE) as usize;
                self.text(x + 3, y + 5, 1, truncate(&cell.display(), chars), BLACK);
            }
            self.fill(MARGIN, y + TABLE_ROW_H - 1, inner, 1, RULE);
            self.y = y + TABLE_ROW_H;
        }
    }

    fn signatures(&mut self, lines: &[SignatureLine]) {
        for line in lines {
            let y = self.y;
            self.text(MARGIN, y, 1, format!("{}:", line.role), BLACK);
            let line_x = MARGIN + 200;
            self.fill(line_x, y + GLYPH_H + 2, 200, 1, BLACK);
            if let Some(name) = &line.name {
                self.text(line_x + 212, y, 1, name.clone(), GREY);
            }
            self.y = y + 28;
        }
    }
}

/// Greedy word wrap; words longer than a line are split
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if line.is_empty() { word.len() } else { line.chars().count() + 1 + word.len() };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.extend(word);
        }
        lines.push(line);
    }
    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else if max_chars <= 1 {
        text.chars().take(max_chars).collect()
    } else {
        let mut s: String = text.chars().take(max_chars - 1).collect();
        s.push('.');
        s
    }
}

fn layout(doc: &ReportDocument, width: u32) -> Layout {
    let mut layout = Layout::new(width);
    layout.heading(1, &doc.title);
    layout.wrapped(
        &format!("Generated {}", doc.generated_at.format("%d.%m.%Y %H:%M UTC")),
        1,
        GREY,
    );
    layout.y += BLOCK_GAP;

    for block in doc.visible_blocks() {
        match &block.kind {
            BlockKind::Heading { level, text } => layout.heading(*level, text),
            BlockKind::Paragraph(text) => layout.wrapped(text, 1, BLACK),
            BlockKind::Metrics(metrics) => layout.metrics(metrics),
            BlockKind::Table(table) => layout.table(table),
            BlockKind::Map(_) => continue,
            BlockKind::Signatures(lines) => layout.signatures(lines),
        }
        layout.y += BLOCK_GAP;
    }
    layout
}

/// Minimum bitmap width that leaves room for content
pub const MIN_WIDTH_PX: u32 = 2 * MARGIN + 120;

/// Render the visible blocks of `doc` at `width` pixels
pub fn rasterize(doc: &ReportDocument, width: u32) -> Result<RgbImage> {
    if width < MIN_WIDTH_PX {
        return Err(Error::Render(format!(
            "Raster width {}px is below the minimum of {}px",
            width, MIN_WIDTH_PX
        )));
    }

    let layout = layout(doc, width);
    let height = layout.y + MARGIN;
    if height > MAX_HEIGHT_PX {
        return Err(Error::Render(format!(
            "Report is too long to rasterize ({}px)",
            height
        )));
    }

    let mut image = RgbImage::from_pixel(width, height, WHITE);
    for op in &layout.ops {
        match op {
            Op::Fill { x, y, w, h, color } => fill_rect(&mut image, *x, *y, *w, *h, *color),
            Op::Text { x, y, scale, text, color } => draw_text(&mut image, *x, *y, *scale, text, *color),
        }
    }
    tracing::debug!(width, height, ops = layout.ops.len(), "Report rasterized");
    Ok(image)
}

fn fill_rect(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    let right = (x + w).min(image.width());
    let bottom = (y + h).min(image.height());
    for py in y..bottom {
        for px in x..right {
            image.put_pixel(px, py, color);
        }
    }
}

fn draw_text(image: &mut RgbImage, mut x: u32, y: u32, scale: u32, text: &str, color: Rgb<u8>) {
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        match glyph_bits(ch) {
            Some(rows) => {
                for (row, pattern) in rows.iter().enumerate() {
                    for col in 0..GLYPH_W {
                        if (pattern >> (GLYPH_W - 1 - col)) & 1 == 1 {
                            fill_rect(image, x + col * scale, y + row as u32 * scale, scale, scale, color);
                        }
                    }
                }
            }
            None => {
                // Unknown glyph: hollow box
                let (w, h) = (GLYPH_W * scale, GLYPH_H * scale);
                fill_rect(image, x, y, w, 1, color);
                fill_rect(image, x, y + h - 1, w, 1, color);
                fill_rect(image, x, y, 1, h, color);
                fill_rect(image, x + w - 1, y, 1, h, color);
            }
        }
        x += ADVANCE * scale;
        if x >= image.width() {
            break;
        }
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        ',' => [0, 0, 0, 0, 0b01100, 0b00100, 0b01000],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        ';' => [0, 0b01100, 0b01100, 0, 0b01100, 0b00100, 0b01000],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '/' => [0b00001, 0b00010, 0b00010, 0b00100, 0b01000, 0b01000, 0b10000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '%' => [0b11000, 0b11001, 0b00010, 0b00100, 0b01000, 0b10011, 0b00011],
        '#' => [0b01010, 0b01010, 0b11111, 0b01010, 0b11111, 0b01010, 0b01010],
        '+' => [0, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0],
        '=' => [0, 0, 0b11111, 0, 0b11111, 0, 0],
        '\'' => [0b00100, 0b00100, 0b01000, 0, 0, 0, 0],
        '"' => [0b01010, 0b01010, 0, 0, 0, 0, 0],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0, 0b00100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0, 0b00100],
        '*' => [0, 0b00100, 0b10101, 0b01110, 0b10101, 0b00100, 0],
        '<' => [0b00010, 0b00100, 0b01000, 0b10000, 0b01000, 0b00100, 0b00010],
        '>' => [0b01000, 0b00100, 0b00010, 0b00001, 0b00010, 0b00100, 0b01000],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(rows)
}
