use std::{io::Cursor, ops::Range};

use base64::{engine::general_purpose::STANDARD, Engine};
use plotters::{
    coord::{
        ranged1d::{DefaultFormatting, KeyPointHint},
        types::RangedCoordf64,
        Shift,
    },
    prelude::*,
    style::{FontDesc, FontFamily, FontStyle, FontTransform},
};
use tariff_domain::{MonthlyAggregate, MonthlyTable};

use crate::pipeline::TariffError;

pub const COMPARISON_TITLE: &str = "Monthly Price Comparison";
pub const FLAT_TITLE: &str = "Monthly Prices";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
        }
    }
}

pub fn title_for(table: &MonthlyTable) -> &'static str {
    if table.has_time_of_day() {
        COMPARISON_TITLE
    } else {
        FLAT_TITLE
    }
}

/// Render the grouped bar chart for `table` as PNG bytes.
pub fn render_png(table: &MonthlyTable, options: &ChartOptions) -> Result<Vec<u8>, TariffError> {
    let (width, height) = (options.width, options.height);
    if width == 0 || height == 0 {
        return Err(TariffError::Chart(format!("invalid chart size {width}x{height}")));
    }

    let mut pixels = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
        draw(&root, table).map_err(|e| TariffError::Chart(e.to_string()))?;
        root.present().map_err(|e| TariffError::Chart(e.to_string()))?;
    }

    let rgb = image::RgbImage::from_raw(width, height, pixels)
        .ok_or_else(|| TariffError::Chart("pixel buffer does not match chart size".to_string()))?;
    let mut png = Vec::new();
    rgb
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| TariffError::Chart(e.to_string()))?;

    metrics::counter!("charts_rendered_total").increment(1);
    Ok(png)
}

/// `data:` URI for embedding a PNG inline in HTML.
pub fn to_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    table: &MonthlyTable,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;

    let months = table.months();
    let columns = table.columns();
    let y_max = match table.max_total() {
        m if m > 0.0 => m * 1.1,
        _ => 1.0,
    };

    let mut chart = ChartBuilder::on(root)
        .caption(title_for(table), FontDesc::new(FontFamily::SansSerif, 24.0, FontStyle::Normal))
        .margin(15)
        .x_label_area_size(80)
        .y_label_area_size(70)
        .build_cartesian_2d(MonthAxis::new(months.len()), 0f64..y_max)?;

    let label = |x: &f64| month_label(months, *x);
    let label_font = FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Normal)
        .transform(FontTransform::Rotate90);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(months.len())
        .x_label_formatter(&label)
        .x_label_style(label_font)
        .x_desc("Month")
        .y_desc("Price")
        .draw()?;

    let bar_width = 0.8 / columns.len() as f64;
    for (ci, column) in columns.iter().copied().enumerate() {
        let color = Palette99::pick(ci).mix(0.9);
        let offset = -0.4 + ci as f64 * bar_width;

        chart
            .draw_series(months.iter().enumerate().filter_map(|(i, m)| {
                let value = m.total(column)?;
                let x0 = i as f64 + offset;
                Some(Rectangle::new([(x0, 0.0), (x0 + bar_width, value)], color.filled()))
            }))?
            .label(column.label())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

/// Continuous x axis with exactly one tick per month.
///
/// Month `i` is centred on x = i, so bars sit at fractional offsets around it
/// while each label lands under its own group.
struct MonthAxis {
    inner: RangedCoordf64,
    months: usize,
}

impl MonthAxis {
    fn new(months: usize) -> Self {
        Self {
            inner: (-0.5..months as f64 - 0.5).into(),
            months,
        }
    }
}

impl Ranged for MonthAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        self.inner.map(value, limit)
    }

    fn key_points<Hint: KeyPointHint>(&self, _hint: Hint) -> Vec<f64> {
        (0..self.months).map(|i| i as f64).collect()
    }

    fn range(&self) -> Range<f64> {
        self.inner.range()
    }
}

fn month_label(months: &[MonthlyAggregate], x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    months.get(x.round() as usize).map(|m| m.month.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tariff_domain::{aggregate_monthly, Reading, Tariff};
    use time::{
        macros::{date, time},
        Date, Month,
    };

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn renders_png_for_flat_table() {
        let table = aggregate_monthly(
            &Tariff::STANDARD,
            false,
            vec![
                Reading::new(date!(2024 - 01 - 01), 10.0),
                Reading::new(date!(2024 - 02 - 01), 8.0),
            ],
        )
        .unwrap();

        let png = render_png(&table, &ChartOptions::default()).unwrap();
        assert_eq!(png[..8], PNG_MAGIC);
        assert_eq!(title_for(&table), FLAT_TITLE);
    }

    #[test]
    fn renders_png_for_time_of_day_table() {
        let table = aggregate_monthly(
            &Tariff::STANDARD,
            true,
            vec![Reading::at(date!(2024 - 01 - 01), time!(08:00), 3.0)],
        )
        .unwrap();

        let png = render_png(&table, &ChartOptions { width: 640, height: 360 }).unwrap();
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (640, 360));
        assert_eq!(title_for(&table), COMPARISON_TITLE);
    }

    #[test]
    fn zero_sized_chart_is_rejected() {
        let readings = vec![Reading::new(date!(2024 - 01 - 01), 1.0)];
        let table = aggregate_monthly(&Tariff::STANDARD, false, readings).unwrap();
        let res = render_png(&table, &ChartOptions { width: 0, height: 10 });
        assert!(matches!(res, Err(TariffError::Chart(_))));
    }

    #[test]
    fn every_month_gets_its_own_label() {
        let readings = (1..=14u8).map(|i| {
            let month = Month::try_from((i - 1) % 12 + 1).unwrap();
            let year = if i > 12 { 2025 } else { 2024 };
            Reading::new(Date::from_calendar_date(year, month, 1).unwrap(), i as f64)
        });
        let table = aggregate_monthly(&Tariff::STANDARD, false, readings).unwrap();
        let months = table.months();

        let ticks = MonthAxis::new(months.len()).key_points(4usize);
        assert_eq!(ticks.len(), 14);
        let labels: Vec<String> = ticks.iter().map(|x| month_label(months, *x)).collect();
        assert_eq!(labels.len(), 14);
        assert_eq!(labels[0], "2024-01");
        assert_eq!(labels[12], "2025-01");
        assert_eq!(labels[13], "2025-02");
        assert_eq!(month_label(months, -1.0), "");
        assert_eq!(month_label(months, 14.0), "");

        let png = render_png(&table, &ChartOptions::default()).unwrap();
        assert_eq!(png[..8], PNG_MAGIC);
    }

    #[test]
    fn data_uri_is_base64_png() {
        assert_eq!(to_data_uri(b"abc"), "data:image/png;base64,YWJj");
    }
}
