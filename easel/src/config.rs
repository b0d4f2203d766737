use crate::{
    error::{EaselError, EaselErrorExt, ErrorKind},
    graphics::{Color, ColorExt},
    s,
    stroke::{Brush, BrushFamily},
    DEFAULT_BRUSH_SIZE, DEFAULT_DPI, DEFAULT_EPSILON, DEFAULT_ERASER_SIZE, MAX_ZOOM, MIN_ZOOM,
    PREDICTION_MS,
};
use std::path::{Path, PathBuf};

macro_rules! config {
    ($($field:ident : $ty:ty $default:block),* $(,)?) => {
        paste::paste! {
            mod default {
                use super::*;
                $(pub fn $field() -> $ty $default)*
            }

            #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
            pub struct Config {
                $(
                    #[serde(default = "default::" $field)]
                    pub $field: $ty,
                )*

                #[serde(skip)]
                pub(crate) had_error_parsing: bool,
            }

            impl Config {
                pub fn new() -> Self {
                    Self {
                        $($field: default::$field(),)*
                        had_error_parsing: false,
                    }
                }
            }
        }
    };
}

config!(
    pen_family: BrushFamily { BrushFamily::LATEST_PEN },
    pen_size: f32 { DEFAULT_BRUSH_SIZE },
    pen_color: Color { Color::BLACK },
    pen_epsilon: f32 { DEFAULT_EPSILON },
    eraser_size: f32 { DEFAULT_ERASER_SIZE },

    prediction_enabled: bool { true },
    prediction_ms: i64 { PREDICTION_MS },

    dpi: f32 { DEFAULT_DPI },
    min_zoom: f32 { MIN_ZOOM },
    max_zoom: f32 { MAX_ZOOM },

    database_path: Option<PathBuf> { None },
);

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn no_dir(what: &str) -> EaselError {
    EaselError::from(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no {what} directory on this platform"),
    ))
}

impl Config {
    fn with_error(self) -> Config {
        Config {
            had_error_parsing: true,
            ..self
        }
    }

    pub fn had_error_parsing(&self) -> bool {
        self.had_error_parsing
    }

    pub fn config_path() -> Result<PathBuf, EaselError> {
        let mut path = dirs::config_dir().ok_or_else(|| no_dir("config"))?;
        path.push("easel");

        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }

        path.push("config.ron");
        Ok(path)
    }

    pub fn from_disk(path: &Path) -> Config {
        tracing::info!("load config from {}", path.display());
        let file = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Config::default();
            }
            Err(err) => {
                EaselError::from(err)
                    .problem(s!(CouldNotOpenConfigFile))
                    .display();
                return Config::default().with_error();
            }
        };

        match ron::from_str(&file) {
            Ok(config) => config,
            Err(err) => {
                EaselError::from(err)
                    .problem(s!(CouldNotOpenConfigFile))
                    .display();
                Config::default().with_error()
            }
        }
    }

    pub fn to_ron_string(&self) -> Result<String, EaselError> {
        let contents = ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::new()
                .new_line(String::from("\n"))
                .indentor(String::from("  "))
                .compact_arrays(true),
        )?;

        Ok(format!(
            "// this file generated automatically.\n// do not edit while easel is running!!\n{contents}"
        ))
    }

    pub fn save(&self, path: &Path) {
        tracing::info!("save config to {}", path.display());

        if self.had_error_parsing {
            // don't overwrite broken configs
            tracing::warn!("not saving over a config that failed to load");
            return;
        }

        self.to_ron_string()
            .and_then(|contents| std::fs::write(path, contents).map_err(EaselError::from))
            .problem(s!(CouldNotSaveConfigFile))
            .display();
    }

    /// The configured database, or `notes.db` in the platform data directory.
    pub fn database_path(&self) -> Result<PathBuf, EaselError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let mut path = dirs::data_dir().ok_or_else(|| no_dir("data"))?;
        path.push("easel");

        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }

        path.push("notes.db");
        Ok(path)
    }

    pub fn pen_brush(&self) -> Brush {
        Brush::new(
            self.pen_family,
            self.pen_color,
            self.pen_size,
            self.pen_epsilon,
        )
    }

    /// Zoom limits, swapped into order if written backwards.
    pub fn zoom_range(&self) -> (f32, f32) {
        if self.min_zoom <= self.max_zoom {
            (self.min_zoom, self.max_zoom)
        } else {
            tracing::warn!(
                "min_zoom {} is above max_zoom {}",
                self.min_zoom,
                self.max_zoom
            );
            (self.max_zoom, self.min_zoom)
        }
    }

    pub fn check(&self) -> Result<(), EaselError> {
        if !(self.dpi > 0.) {
            return Err(EaselError::new(ErrorKind::InvalidInput("dpi must be positive")));
        }
        if !(self.min_zoom > 0. && self.max_zoom > 0.)
            || !self.min_zoom.is_finite()
            || !self.max_zoom.is_finite()
        {
            return Err(EaselError::new(ErrorKind::InvalidInput(
                "zoom limits must be positive",
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("easel-config-{}-{name}.ron", std::process::id()));
        path
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: Config = ron::from_str("(pen_size: 7.5, prediction_enabled: false)").unwrap();
        assert_eq!(config.pen_size, 7.5);
        assert!(!config.prediction_enabled);
        assert_eq!(config.dpi, DEFAULT_DPI);
        assert_eq!(config.pen_brush().family, BrushFamily::LATEST_PEN);
    }

    #[test]
    fn round_trips_through_disk() {
        let path = temp_path("round-trip");
        let config = Config {
            eraser_size: 42.,
            database_path: Some(PathBuf::from("/tmp/somewhere.db")),
            ..Config::new()
        };
        config.save(&path);

        let loaded = Config::from_disk(&path);
        assert_eq!(loaded, config);
        assert!(!loaded.had_error_parsing());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn broken_config_is_not_overwritten() {
        let path = temp_path("broken");
        std::fs::write(&path, "(pen_size: \"very big\"").unwrap();

        let config = Config::from_disk(&path);
        assert!(config.had_error_parsing());
        assert_eq!(config.pen_size, DEFAULT_BRUSH_SIZE);

        config.save(&path);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "(pen_size: \"very big\""
        );
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn zoom_range_is_ordered() {
        let config = Config {
            min_zoom: 8.,
            max_zoom: 2.,
            ..Config::new()
        };
        assert_eq!(config.zoom_range(), (2., 8.));
        assert!(Config::new().check().is_ok());
        assert!(Config { dpi: 0., ..Config::new() }.check().is_err());
        assert!(Config { min_zoom: 0., ..Config::new() }.check().is_err());
        assert!(Config { max_zoom: f32::NAN, ..Config::new() }.check().is_err());
    }
}
