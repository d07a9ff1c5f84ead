//! PDF rendering of chart pages via `printpdf`.
//!
//! Each [`ChartPage`] becomes one A4 landscape page drawn with vector
//! primitives and the built-in Helvetica fonts. The whole document is
//! serialized in memory; nothing touches the filesystem here.

use std::io::BufWriter;

use chrono::NaiveDate;
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon, Rgb,
};

use super::charts::{Bar, Chart, ChartPage, LineSeries};
use crate::error::ReportError;

const PAGE_W: f32 = 297.0;
const PAGE_H: f32 = 210.0;

const PLOT_LEFT: f32 = 32.0;
const PLOT_BOTTOM: f32 = 38.0;
const PLOT_TOP: f32 = 178.0;
const PLOT_RIGHT: f32 = 272.0;
const PAGE_MARGIN: f32 = 5.0;

const LEGEND_GAP: f32 = 6.0;
const LEGEND_COL_W: f32 = 55.0;
const LEGEND_MAX_COLS: usize = 3;
const LEGEND_ROW_MAX: f32 = 6.0;
const LEGEND_ROW_MIN: f32 = 3.5;
const LEGEND_FONT_MAX: f32 = 9.0;
const LEGEND_SWATCH_W: f32 = 10.0;

const PT_TO_MM: f32 = 0.3528;
const DOCUMENT_ID: &str = "LABDAILYQUALITYREPORT";
const EMPTY_MESSAGE: &str = "No data available";

/// Line and bar colours, cycled per series.
const PALETTE: [(f32, f32, f32); 10] = [
    (0.12, 0.47, 0.71),
    (1.00, 0.50, 0.05),
    (0.17, 0.63, 0.17),
    (0.84, 0.15, 0.16),
    (0.58, 0.40, 0.74),
    (0.55, 0.34, 0.29),
    (0.89, 0.47, 0.76),
    (0.50, 0.50, 0.50),
    (0.74, 0.74, 0.13),
    (0.09, 0.75, 0.81),
];

/// Marker shapes; the shape changes each time the palette wraps around.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Marker {
    Square,
    Diamond,
    Triangle,
}

const MARKERS: [Marker; 3] = [Marker::Square, Marker::Diamond, Marker::Triangle];

// ---

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// The drawable rectangle of a page, in millimetres.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
}

/// Column-major legend placement to the right of the plot.
#[derive(Debug, Clone, PartialEq)]
struct LegendLayout {
    left: f32,
    rows: usize,
    row_h: f32,
    font_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
struct LegendEntry {
    x: f32,
    y: f32,
    text: String,
}

/// A linear value axis with evenly spaced ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Axis {
    lo: f64,
    hi: f64,
    step: f64,
}

/// Render the pages, in order, into a single PDF document.
pub fn render_pdf(pages: &[ChartPage]) -> Result<Vec<u8>, ReportError> {
    // ---
    let Some(first) = pages.first() else {
        return Err(ReportError::Render("report has no pages".to_string()));
    };

    let (doc, page1, layer1) =
        PdfDocument::new(&first.title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let doc = with_fixed_metadata(doc);

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Render(format!("PDF font error: {e}")))?,
    };

    for (i, page) in pages.iter().enumerate() {
        let layer = if i == 0 {
            doc.get_page(page1).get_layer(layer1)
        } else {
            let (p, l) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
            doc.get_page(p).get_layer(l)
        };
        draw_page(&layer, &fonts, page)?;
        tracing::debug!("Rendered page {}: {}", i + 1, page.title);
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| ReportError::Render(format!("PDF save error: {e}")))?;
    let mut bytes = buf
        .into_inner()
        .map_err(|e| ReportError::Render(format!("PDF buffer error: {e}")))?;
    pin_trailer_id(&mut bytes);
    Ok(bytes)
}

/// Overwrite the two random strings of the trailer `/ID[(..)(..)]` array
/// with the fixed document id, keeping their length so xref offsets hold.
fn pin_trailer_id(bytes: &mut [u8]) {
    // ---
    const MARKER: &[u8] = b"/ID[";
    let Some(start) = bytes.windows(MARKER.len()).rposition(|w| w == MARKER) else {
        tracing::warn!("PDF trailer has no /ID array; output will not be reproducible");
        return;
    };

    let id = DOCUMENT_ID.as_bytes();
    let mut i = start + MARKER.len();
    for _ in 0..2 {
        while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
            i += 1;
        }
        if bytes.get(i) != Some(&b'(') {
            return;
        }
        let Some(len) = bytes[i + 1..].iter().position(|b| *b == b')') else {
            return;
        };
        for (k, b) in bytes[i + 1..i + 1 + len].iter_mut().enumerate() {
            *b = id[k % id.len()];
        }
        i += len + 2;
    }
}

/// Pin the dates that would otherwise differ between runs. The trailer ids
/// are pinned after saving, see [`pin_trailer_id`].
fn with_fixed_metadata(doc: PdfDocumentReference) -> PdfDocumentReference {
    // ---
    let epoch = time::OffsetDateTime::UNIX_EPOCH;
    doc.with_creation_date(epoch)
        .with_mod_date(epoch)
        .with_metadata_date(epoch)
}

fn draw_page(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    page: &ChartPage,
) -> Result<(), ReportError> {
    // ---
    let legend = match &page.chart {
        Chart::Line {
            series,
            show_legend: true,
        } if !page.is_empty() => Some(legend_layout(series.len())),
        _ => None,
    };
    let area = PlotArea {
        left: PLOT_LEFT,
        right: legend
            .as_ref()
            .map_or(PLOT_RIGHT, |l| l.left - LEGEND_GAP),
        bottom: PLOT_BOTTOM,
        top: PLOT_TOP,
    };

    draw_text_centered(layer, &page.title, 16.0, PAGE_W / 2.0, 192.0, &fonts.bold);
    draw_text_centered(
        layer,
        &page.x_label,
        10.0,
        (area.left + area.right) / 2.0,
        14.0,
        &fonts.regular,
    );
    layer.use_text(
        page.y_label.as_str(),
        10.0,
        Mm(area.left - 20.0),
        Mm(area.top + 4.0),
        &fonts.regular,
    );

    if page.is_empty() {
        draw_frame(layer, area);
        draw_text_centered(
            layer,
            EMPTY_MESSAGE,
            14.0,
            (area.left + area.right) / 2.0,
            (area.bottom + area.top) / 2.0,
            &fonts.regular,
        );
        return Ok(());
    }

    match &page.chart {
        Chart::Bar(bars) => draw_bar_chart(layer, fonts, area, bars)?,
        Chart::Line { series, .. } => {
            draw_line_chart(layer, fonts, area, series)?;
            if let Some(layout) = &legend {
                draw_legend(layer, fonts, layout, series);
            }
        }
    }
    Ok(())
}

fn draw_bar_chart(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    area: PlotArea,
    bars: &[Bar],
) -> Result<(), ReportError> {
    // ---
    let axis = value_axis(bars.iter().map(|b| b.value), true)?;
    draw_y_axis(layer, fonts, area, axis);
    draw_frame(layer, area);

    let slot = (area.right - area.left) / bars.len() as f32;
    let bar_w = slot * 0.6;
    let (r, g, b) = PALETTE[0];
    let base = y_pos(area, axis, 0.0_f64.clamp(axis.lo, axis.hi));
    let label_size = bar_label_size(slot);

    for (i, bar) in bars.iter().enumerate() {
        let center = area.left + slot * (i as f32 + 0.5);
        let top = y_pos(area, axis, bar.value);
        layer.set_fill_color(rgb(r, g, b));
        fill_rect(layer, center - bar_w / 2.0, base, center + bar_w / 2.0, top);
        reset_colors(layer);
        let label = fit_label(&bar.label, slot * 0.95, label_size);
        draw_text_centered(layer, &label, label_size, center, area.bottom - 6.0, &fonts.regular);
    }
    Ok(())
}

fn draw_line_chart(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    area: PlotArea,
    series: &[LineSeries],
) -> Result<(), ReportError> {
    // ---
    let axis = value_axis(
        series.iter().flat_map(|s| s.points.iter().map(|(_, v)| *v)),
        false,
    )?;
    let dates: Vec<NaiveDate> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(d, _)| *d))
        .collect();
    let (first, last) = match (dates.iter().min(), dates.iter().max()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(ReportError::Render("line chart without dates".to_string())),
    };

    draw_y_axis(layer, fonts, area, axis);
    draw_date_axis(layer, fonts, area, first, last);
    draw_frame(layer, area);

    for (i, s) in series.iter().enumerate() {
        let ((r, g, b), marker) = series_style(i);
        layer.set_outline_color(rgb(r, g, b));
        layer.set_fill_color(rgb(r, g, b));
        layer.set_outline_thickness(1.2);

        let points: Vec<(f32, f32)> = s
            .points
            .iter()
            .map(|(d, v)| (x_pos(area, first, last, *d), y_pos(area, axis, *v)))
            .collect();

        if points.len() > 1 {
            stroke_polyline(layer, &points);
        }
        for (x, y) in &points {
            draw_marker(layer, marker, *x, *y, 0.9);
        }
    }
    reset_colors(layer);
    Ok(())
}

/// Size the legend so every series fits between the plot's bottom and top:
/// rows shrink down to [`LEGEND_ROW_MIN`], then the legend grows extra
/// columns, and past [`LEGEND_MAX_COLS`] rows keep shrinking.
fn legend_layout(count: usize) -> LegendLayout {
    // ---
    let height = PLOT_TOP - PLOT_BOTTOM;
    let fit_at_min = (height / LEGEND_ROW_MIN).floor() as usize;
    let columns = count.div_ceil(fit_at_min).clamp(1, LEGEND_MAX_COLS);
    let rows = count.div_ceil(columns).max(1);
    let row_h = (height / rows as f32).min(LEGEND_ROW_MAX);

    LegendLayout {
        left: PAGE_W - PAGE_MARGIN - columns as f32 * LEGEND_COL_W,
        rows,
        row_h,
        font_size: (row_h * 0.75 / PT_TO_MM).min(LEGEND_FONT_MAX),
    }
}

/// Position and fitted text of each legend entry, filling columns top-down.
fn legend_entries<'a>(
    layout: &LegendLayout,
    labels: impl Iterator<Item = &'a str>,
) -> Vec<LegendEntry> {
    // ---
    let text_room = LEGEND_COL_W - LEGEND_SWATCH_W - 2.0;
    labels
        .enumerate()
        .map(|(i, label)| {
            let col = i / layout.rows;
            let row = i % layout.rows;
            LegendEntry {
                x: layout.left + col as f32 * LEGEND_COL_W,
                y: (PLOT_TOP - (row + 1) as f32 * layout.row_h).max(PLOT_BOTTOM),
                text: fit_label(label, text_room, layout.font_size),
            }
        })
        .collect()
}

fn draw_legend(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    layout: &LegendLayout,
    series: &[LineSeries],
) {
    // ---
    let entries = legend_entries(layout, series.iter().map(|s| s.label.as_str()));
    let mid = layout.row_h * 0.3;

    for (i, entry) in entries.into_iter().enumerate() {
        let ((r, g, b), marker) = series_style(i);
        layer.set_outline_color(rgb(r, g, b));
        layer.set_fill_color(rgb(r, g, b));
        layer.set_outline_thickness(1.2);
        stroke_polyline(
            layer,
            &[(entry.x, entry.y + mid), (entry.x + 8.0, entry.y + mid)],
        );
        draw_marker(layer, marker, entry.x + 4.0, entry.y + mid, 0.8);
        reset_colors(layer);
        layer.use_text(
            entry.text,
            layout.font_size,
            Mm(entry.x + LEGEND_SWATCH_W),
            Mm(entry.y),
            &fonts.regular,
        );
    }
}

/// Colour and marker for the i-th series.
fn series_style(i: usize) -> ((f32, f32, f32), Marker) {
    // ---
    let marker = MARKERS[(i / PALETTE.len()) % MARKERS.len()];
    (PALETTE[i % PALETTE.len()], marker)
}

/// Bar labels shrink from 8 pt toward 5 pt as slots get narrower.
fn bar_label_size(slot: f32) -> f32 {
    (slot / 4.0).clamp(5.0, 8.0)
}

/// Truncate `text` with `..` so it is at most `max_width` wide at `size`.
fn fit_label(text: &str, max_width: f32, size: f32) -> String {
    // ---
    if text_width(text, size) <= max_width {
        return text.to_string();
    }
    let per_char = size * 0.5 * PT_TO_MM;
    let room = (max_width / per_char).floor() as usize;
    if room <= 2 {
        return String::new();
    }
    let mut out: String = text.chars().take(room - 2).collect();
    out.push_str("..");
    out
}

fn draw_y_axis(layer: &PdfLayerReference, fonts: &Fonts, area: PlotArea, axis: Axis) {
    // ---
    reset_colors(layer);
    layer.set_outline_thickness(0.5);

    let decimals = tick_decimals(axis.step);
    let ticks = ((axis.hi - axis.lo) / axis.step).round() as usize;
    for i in 0..=ticks {
        let value = axis.lo + axis.step * i as f64;
        let y = y_pos(area, axis, value);
        stroke_polyline(layer, &[(area.left - 1.5, y), (area.left, y)]);
        let label = format!("{:.*}", decimals, value);
        let w = text_width(&label, 8.0);
        layer.use_text(label, 8.0, Mm(area.left - 3.0 - w), Mm(y - 1.0), &fonts.regular);
    }
}

fn draw_date_axis(
    layer: &PdfLayerReference,
    fonts: &Fonts,
    area: PlotArea,
    first: NaiveDate,
    last: NaiveDate,
) {
    // ---
    reset_colors(layer);
    layer.set_outline_thickness(0.5);

    let span = (last - first).num_days();
    let stride = (span / 6 + 1).max(1);
    let mut day = 0;
    while day <= span {
        let date = first + chrono::Duration::days(day);
        let x = x_pos(area, first, last, date);
        stroke_polyline(layer, &[(x, area.bottom - 1.5), (x, area.bottom)]);
        let label = date.format("%Y-%m-%d").to_string();
        draw_text_centered(layer, &label, 8.0, x, area.bottom - 6.0, &fonts.regular);
        day += stride;
    }
}

fn draw_frame(layer: &PdfLayerReference, area: PlotArea) {
    // ---
    reset_colors(layer);
    layer.set_outline_thickness(0.6);
    layer.add_line(Line {
        points: [
            (area.left, area.bottom),
            (area.right, area.bottom),
            (area.right, area.top),
            (area.left, area.top),
        ]
        .iter()
        .map(|(x, y)| (Point::new(Mm(*x), Mm(*y)), false))
        .collect(),
        is_closed: true,
    });
}

fn stroke_polyline(layer: &PdfLayerReference, points: &[(f32, f32)]) {
    // ---
    layer.add_line(Line {
        points: points
            .iter()
            .map(|(x, y)| (Point::new(Mm(*x), Mm(*y)), false))
            .collect(),
        is_closed: false,
    });
}

fn fill_rect(layer: &PdfLayerReference, x0: f32, y0: f32, x1: f32, y1: f32) {
    fill_polygon(layer, &[(x0, y0), (x1, y0), (x1, y1), (x0, y1)]);
}

fn draw_marker(layer: &PdfLayerReference, marker: Marker, x: f32, y: f32, r: f32) {
    // ---
    match marker {
        Marker::Square => fill_rect(layer, x - r, y - r, x + r, y + r),
        Marker::Diamond => {
            let d = r * 1.3;
            fill_polygon(layer, &[(x, y - d), (x + d, y), (x, y + d), (x - d, y)]);
        }
        Marker::Triangle => {
            let d = r * 1.3;
            fill_polygon(layer, &[(x - d, y - d), (x + d, y - d), (x, y + d)]);
        }
    }
}

fn fill_polygon(layer: &PdfLayerReference, corners: &[(f32, f32)]) {
    // ---
    let ring: Vec<(Point, bool)> = corners
        .iter()
        .map(|(x, y)| (Point::new(Mm(*x), Mm(*y)), false))
        .collect();
    layer.add_polygon(Polygon {
        rings: vec![ring],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

fn draw_text_centered(
    layer: &PdfLayerReference,
    text: &str,
    size: f32,
    center_x: f32,
    y: f32,
    font: &IndirectFontRef,
) {
    // ---
    let x = center_x - text_width(text, size) / 2.0;
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

fn reset_colors(layer: &PdfLayerReference) {
    // ---
    layer.set_outline_color(rgb(0.0, 0.0, 0.0));
    layer.set_fill_color(rgb(0.0, 0.0, 0.0));
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Rough Helvetica advance width; good enough to centre short labels.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.5 * PT_TO_MM
}

fn y_pos(area: PlotArea, axis: Axis, value: f64) -> f32 {
    // ---
    let frac = (value - axis.lo) / (axis.hi - axis.lo);
    area.bottom + (area.top - area.bottom) * frac as f32
}

/// Map a date into the plot, leaving a 5% margin on both sides. A single
/// date sits in the middle.
fn x_pos(area: PlotArea, first: NaiveDate, last: NaiveDate, date: NaiveDate) -> f32 {
    // ---
    let width = area.right - area.left;
    let span = (last - first).num_days();
    if span == 0 {
        return area.left + width / 2.0;
    }
    let frac = (date - first).num_days() as f32 / span as f32;
    area.left + width * (0.05 + 0.9 * frac)
}

/// Choose a tick-aligned range covering every value. Bar charts always
/// include zero so bars grow from the baseline.
fn value_axis(values: impl Iterator<Item = f64>, include_zero: bool) -> Result<Axis, ReportError> {
    // ---
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in values {
        if !v.is_finite() {
            return Err(ReportError::Render(format!("cannot plot value {v}")));
        }
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        return Err(ReportError::Render("no values to plot".to_string()));
    }
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if hi - lo < f64::EPSILON {
        if include_zero {
            // every value is zero
            hi = lo + 1.0;
        } else {
            let pad = if lo == 0.0 { 1.0 } else { lo.abs() * 0.05 };
            lo -= pad;
            hi += pad;
        }
    }

    let step = nice_step((hi - lo) / 5.0);
    Ok(Axis {
        lo: (lo / step).floor() * step,
        hi: (hi / step).ceil() * step,
        step,
    })
}

/// Round a raw step up to 1, 2 or 5 times a power of ten.
fn nice_step(raw: f64) -> f64 {
    // ---
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn tick_decimals(step: f64) -> usize {
    // ---
    if step >= 1.0 {
        0
    } else {
        (-step.log10()).ceil() as usize
    }
}
