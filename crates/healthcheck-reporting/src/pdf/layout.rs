//! Page layout of the exported report.
//!
//! Produces a list of pages, each a list of drawing operations in millimetres
//! with the origin at the top-left corner. Text `y` is the baseline. The
//! writer turns these into PDF content streams.

use healthcheck_core::text_utils::clean_markdown;

use super::metrics::split_text_to_size;
use crate::types::ReportData;

pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;
pub const MARGIN: f64 = 20.0;
pub const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;
/// Lowest baseline body text may reach.
pub const CONTENT_BOTTOM: f64 = PAGE_HEIGHT - MARGIN;

const HEADER_HEIGHT: f64 = 35.0;

const NOTICE_HEIGHT: f64 = 32.0;
const NOTICE_TOP: f64 = 10.0;
/// Where content resumes on pages after the first, below the notice box.
pub const CONTINUATION_TOP: f64 = NOTICE_TOP + NOTICE_HEIGHT + 8.0;
pub const ICON_SIZE: f64 = 18.0;
const ICON_PADDING: f64 = 5.0;

const SUMMARY_TITLE_HEIGHT: f64 = 14.0;
const SUMMARY_LINE_HEIGHT: f64 = 5.0;
const SUMMARY_PADDING: f64 = 16.0;

const FOOTER_Y: f64 = PAGE_HEIGHT - 10.0;

pub const NOTICE_TITLE: &str = "Aviso Importante";
pub const NOTICE_TEXT: &str = "Esta interpretación fue generada con el apoyo de Inteligencia Artificial (IA) y tiene fines meramente informativos. NO sustituye el diagnóstico, la opinión o el tratamiento de un médico o profesional de la salud cualificado. Consulte siempre a su médico con sus resultados originales.";
pub const FOOTER_BRAND: &str = "Generado por HealthCheck";
const UNNAMED_FILE: &str = "Sin nombre";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const PRIMARY_BLUE: Rgb = Rgb(0, 123, 255);
pub const DARK_TEXT: Rgb = Rgb(33, 37, 41);
pub const GRAY_TEXT: Rgb = Rgb(108, 117, 125);
pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const WARNING_BORDER: Rgb = Rgb(255, 193, 7);
pub const WARNING_BG: Rgb = Rgb(255, 251, 235);
pub const WARNING_TEXT: Rgb = Rgb(133, 100, 4);
pub const SUMMARY_BG: Rgb = Rgb(240, 248, 255);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    FillRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        fill: Rgb,
    },
    RoundedRect {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        radius: f64,
        fill: Rgb,
        stroke: Rgb,
        line_width: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Rgb,
        width: f64,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        font: Font,
        size: f64,
        color: Rgb,
        align: Align,
    },
    /// The warning icon, scaled into the given box.
    Icon { x: f64, y: f64, w: f64, h: f64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Text runs on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

struct Composer {
    pages: Vec<Page>,
    y: f64,
    has_icon: bool,
}

impl Composer {
    fn page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = CONTINUATION_TOP;
    }

    #[allow(clippy::too_many_arguments)]
    fn text(&mut self, x: f64, y: f64, text: &str, font: Font, size: f64, color: Rgb, align: Align) {
        if text.is_empty() {
            return;
        }
        self.page().ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            font,
            size,
            color,
            align,
        });
    }

    fn header(&mut self, report: &ReportData) {
        self.page().ops.push(DrawOp::FillRect {
            x: 0.0,
            y: 0.0,
            w: PAGE_WIDTH,
            h: HEADER_HEIGHT,
            fill: PRIMARY_BLUE,
        });
        let center = PAGE_WIDTH / 2.0;
        self.text(center, 18.0, "HealthCheck", Font::Bold, 24.0, WHITE, Align::Center);
        self.text(center, 28.0, "Resultados del Análisis", Font::Regular, 12.0, WHITE, Align::Center);

        self.y = 45.0;
        let name = report.file_name.as_deref().unwrap_or(UNNAMED_FILE);
        self.text(MARGIN, self.y, "Archivo: ", Font::Bold, 11.0, DARK_TEXT, Align::Left);
        self.text(MARGIN + 18.0, self.y, name, Font::Regular, 11.0, DARK_TEXT, Align::Left);
        self.y += 6.0;
        self.text(MARGIN, self.y, "Fecha: ", Font::Bold, 11.0, DARK_TEXT, Align::Left);
        self.text(MARGIN + 14.0, self.y, &report.generated_at, Font::Regular, 11.0, DARK_TEXT, Align::Left);
        self.y += 10.0;
    }

    fn notice_box(&mut self, page_idx: usize, box_y: f64) {
        let offset = if self.has_icon {
            ICON_SIZE + ICON_PADDING + 8.0
        } else {
            5.0
        };
        let mut ops = vec![DrawOp::RoundedRect {
            x: MARGIN,
            y: box_y,
            w: CONTENT_WIDTH,
            h: NOTICE_HEIGHT,
            radius: 3.0,
            fill: WARNING_BG,
            stroke: WARNING_BORDER,
            line_width: 0.5,
        }];
        if self.has_icon {
            ops.push(DrawOp::Icon {
                x: MARGIN + ICON_PADDING,
                y: box_y + (NOTICE_HEIGHT - ICON_SIZE) / 2.0,
                w: ICON_SIZE,
                h: ICON_SIZE,
            });
        }
        let x = MARGIN + offset;
        ops.push(DrawOp::Text {
            x,
            y: box_y + 8.0,
            text: NOTICE_TITLE.to_string(),
            font: Font::Bold,
            size: 10.0,
            color: WARNING_TEXT,
            align: Align::Left,
        });
        let lines = split_text_to_size(NOTICE_TEXT, CONTENT_WIDTH - offset - 5.0, 8.0, Font::Regular);
        for (i, line) in lines.into_iter().enumerate() {
            ops.push(DrawOp::Text {
                x,
                y: box_y + 14.0 + 4.0 * i as f64,
                text: line,
                font: Font::Regular,
                size: 8.0,
                color: WARNING_TEXT,
                align: Align::Left,
            });
        }
        self.pages[page_idx].ops.extend(ops);
    }

    /// Summary box, split into continuation boxes when it does not fit on
    /// one page.
    fn summary(&mut self, summary: &str) {
        let cleaned = clean_markdown(Some(summary));
        let lines = split_text_to_size(&cleaned, CONTENT_WIDTH - 10.0, 10.0, Font::Regular);
        let fresh_capacity = summary_lines_fitting(CONTENT_BOTTOM - CONTINUATION_TOP);

        let mut rest: &[String] = &lines;
        let mut first = true;
        while !rest.is_empty() {
            let mut fit = summary_lines_fitting(CONTENT_BOTTOM - self.y);
            if fit < rest.len().min(fresh_capacity) {
                self.new_page();
                fit = fresh_capacity;
            }
            let take = fit.clamp(1, rest.len());
            let (chunk, tail) = rest.split_at(take);
            self.summary_chunk(chunk, first);
            rest = tail;
            first = false;
        }
    }

    fn summary_chunk(&mut self, lines: &[String], first: bool) {
        let start = self.y;
        let height = summary_box_height(lines.len());
        self.page().ops.push(DrawOp::RoundedRect {
            x: MARGIN,
            y: start,
            w: CONTENT_WIDTH,
            h: height,
            radius: 3.0,
            fill: SUMMARY_BG,
            stroke: PRIMARY_BLUE,
            line_width: 0.5,
        });
        let title = if first {
            "Resumen General"
        } else {
            "Resumen General (continuación)"
        };
        self.text(MARGIN + 5.0, start + 10.0, title, Font::Bold, 12.0, PRIMARY_BLUE, Align::Left);
        let mut y = start + 18.0;
        for line in lines {
            self.text(MARGIN + 5.0, y, line, Font::Regular, 10.0, DARK_TEXT, Align::Left);
            y += SUMMARY_LINE_HEIGHT;
        }
        self.y = start + height + 10.0;
    }

    fn flowing_text(&mut self, text: &str, size: f64, color: Rgb, font: Font) {
        let line_height = size * 0.5;
        for line in split_text_to_size(text, CONTENT_WIDTH, size, font) {
            if self.y + line_height > CONTENT_BOTTOM {
                self.new_page();
            }
            let y = self.y;
            self.text(MARGIN, y, &line, font, size, color, Align::Left);
            self.y += line_height;
        }
    }

    fn section(&mut self, title: &str, content: Option<&str>) {
        if self.y + 20.0 > CONTENT_BOTTOM {
            self.new_page();
        }
        let y = self.y;
        self.page().ops.push(DrawOp::Line {
            x1: MARGIN,
            y1: y,
            x2: PAGE_WIDTH - MARGIN,
            y2: y,
            color: PRIMARY_BLUE,
            width: 0.5,
        });
        self.y += 8.0;
        self.flowing_text(title, 14.0, PRIMARY_BLUE, Font::Bold);
        self.y += 4.0;
        self.flowing_text(&clean_markdown(content), 10.0, DARK_TEXT, Font::Regular);
        self.y += 10.0;
    }

    fn footers(&mut self) {
        let total = self.pages.len();
        for i in 0..total {
            if i > 0 {
                self.notice_box(i, NOTICE_TOP);
            }
            let label = format!("Página {} de {}", i + 1, total);
            let ops = &mut self.pages[i].ops;
            ops.push(footer_text(PAGE_WIDTH / 2.0, label, Align::Center));
            ops.push(footer_text(PAGE_WIDTH - MARGIN, FOOTER_BRAND.to_string(), Align::Right));
        }
    }
}

fn footer_text(x: f64, text: String, align: Align) -> DrawOp {
    DrawOp::Text {
        x,
        y: FOOTER_Y,
        text,
        font: Font::Regular,
        size: 8.0,
        color: GRAY_TEXT,
        align,
    }
}

fn summary_box_height(lines: usize) -> f64 {
    SUMMARY_TITLE_HEIGHT + lines as f64 * SUMMARY_LINE_HEIGHT + SUMMARY_PADDING
}

fn summary_lines_fitting(available: f64) -> usize {
    let room = available - SUMMARY_TITLE_HEIGHT - SUMMARY_PADDING;
    if room < SUMMARY_LINE_HEIGHT {
        0
    } else {
        (room / SUMMARY_LINE_HEIGHT).floor() as usize
    }
}

/// Lay out the full report. `has_icon` reserves room for the warning icon
/// in every notice box.
pub fn layout_report(report: &ReportData, has_icon: bool) -> Vec<Page> {
    let mut c = Composer {
        pages: vec![Page::default()],
        y: 0.0,
        has_icon,
    };

    c.header(report);
    let notice_y = c.y;
    c.notice_box(0, notice_y);
    c.y += NOTICE_HEIGHT + 10.0;

    if let Some(summary) = report.result.summary() {
        c.summary(summary);
    }
    c.section("Interpretación de Conceptos", report.result.interpretation());
    c.section("Resultados Simplificados", report.result.simplified());

    c.footers();
    c.pages
}
