use once_cell::sync::Lazy;
use serde::Deserialize;
use time::format_description::{self, OwnedFormatItem};

use crate::pipeline::TariffError;

/// Where the date, usage and (optional) time values live in each record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnSpec {
    /// Columns looked up by header name.
    Named {
        date: String,
        kwh: String,
        #[serde(default)]
        time: Option<String>,
    },
    /// Zero-based column positions.
    Positional {
        date: usize,
        kwh: usize,
        #[serde(default)]
        time: Option<usize>,
    },
}

/// Declared shape of an uploaded usage file.
///
/// Date and time formats use the `time` crate format description syntax,
/// e.g. `[day]/[month]/[year]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CsvLayout {
    pub name: String,
    pub columns: ColumnSpec,
    /// Lines dropped before the header (disclaimers, export banners).
    #[serde(default)]
    pub skip_lines: usize,
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_has_header() -> bool {
    true
}

fn default_delimiter() -> char {
    ','
}

fn default_date_format() -> String {
    "[day padding:none]/[month padding:none]/[year]".to_string()
}

fn default_time_format() -> String {
    "[hour padding:none]:[minute]".to_string()
}

/// Parsed date/time format descriptions for one layout.
pub struct Formats {
    pub date: OwnedFormatItem,
    pub time: OwnedFormatItem,
}

impl CsvLayout {
    pub fn named(name: &str, time: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            columns: ColumnSpec::Named {
                date: "date".to_string(),
                kwh: "kwh".to_string(),
                time: time.map(str::to_string),
            },
            skip_lines: 0,
            has_header: true,
            delimiter: default_delimiter(),
            date_format: default_date_format(),
            time_format: default_time_format(),
        }
    }

    pub fn has_time_column(&self) -> bool {
        match &self.columns {
            ColumnSpec::Named { time, .. } => time.is_some(),
            ColumnSpec::Positional { time, .. } => time.is_some(),
        }
    }

    pub fn delimiter_byte(&self) -> Result<u8, TariffError> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| self.invalid(format!("delimiter '{}' is not ASCII", self.delimiter)))
    }

    pub fn formats(&self) -> Result<Formats, TariffError> {
        let date = format_description::parse_owned::<1>(&self.date_format)
            .map_err(|e| self.invalid(format!("date_format: {e}")))?;
        let time = format_description::parse_owned::<1>(&self.time_format)
            .map_err(|e| self.invalid(format!("time_format: {e}")))?;
        Ok(Formats { date, time })
    }

    /// Check everything that can be checked without data.
    pub fn validate(&self) -> Result<(), TariffError> {
        if matches!(self.columns, ColumnSpec::Named { .. }) && !self.has_header {
            return Err(self.invalid("named columns require a header row".to_string()));
        }
        self.delimiter_byte()?;
        self.formats()?;
        Ok(())
    }

    fn invalid(&self, message: String) -> TariffError {
        TariffError::Layout {
            layout: self.name.clone(),
            message,
        }
    }
}

static BUILTIN_LAYOUTS: Lazy<Vec<CsvLayout>> = Lazy::new(|| {
    vec![
        CsvLayout::named("named", None),
        CsvLayout::named("named_time", Some("time")),
        CsvLayout {
            name: "positional_time".to_string(),
            columns: ColumnSpec::Positional {
                date: 0,
                time: Some(1),
                kwh: 2,
            },
            skip_lines: 2,
            has_header: true,
            delimiter: default_delimiter(),
            date_format: default_date_format(),
            time_format: default_time_format(),
        },
    ]
});

/// Layouts available without any configuration.
pub fn builtin_layouts() -> &'static [CsvLayout] {
    &BUILTIN_LAYOUTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layouts_are_valid() {
        for layout in builtin_layouts() {
            layout.validate().unwrap();
        }
        assert!(!builtin_layouts()[0].has_time_column());
        assert!(builtin_layouts()[1].has_time_column());
        assert!(builtin_layouts()[2].has_time_column());
    }

    #[test]
    fn named_layout_without_header_is_rejected() {
        let mut layout = CsvLayout::named("broken", None);
        layout.has_header = false;
        assert!(matches!(layout.validate(), Err(TariffError::Layout { .. })));
    }

    #[test]
    fn bad_format_description_is_rejected() {
        let mut layout = CsvLayout::named("broken", None);
        layout.date_format = "[dya]/[month]".to_string();
        assert!(matches!(layout.validate(), Err(TariffError::Layout { .. })));
    }

    #[test]
    fn layout_deserializes_from_toml() {
        let layout: CsvLayout = toml::from_str(
            r#"
            name = "semicolon"
            delimiter = ";"
            skip_lines = 1
            columns = { kind = "positional", date = 0, kwh = 3 }
            "#,
        )
        .unwrap();

        assert_eq!(layout.delimiter_byte().unwrap(), b';');
        assert_eq!(layout.skip_lines, 1);
        assert!(layout.has_header);
        assert!(!layout.has_time_column());
    }
}
