//! Reading, validating and resolving config files.
//!
//! The pipeline is: detect the format from the extension, deserialize into
//! [`ConfigData`], validate, then resolve into a runtime [`SimConfig`] with
//! fixed-point quantities.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bastion_core::catalog::{GeneratorSpec, ProducerSpec, StorageSpec, StructureSpec};
use bastion_core::config::{
    ConstructionConfig, GridConfig, MAX_RADIUS, PowerConfig, SimConfig, UnitDefaults,
};
use bastion_core::fixed::{Fixed64, Ticks};
use bastion_core::grid::{Footprint, TerrainDef};
use bastion_core::resource::ResourceAmounts;
use bastion_core::structure::StructureKind;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::schema::{AmountsData, ConfigData, StructureData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading a config file.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The file parsed but a value is out of range.
    #[error("invalid value in {file}: {detail}")]
    Invalid { file: PathBuf, detail: String },

    /// The same structure kind is listed twice.
    #[error("duplicate structure kind '{kind:?}' in {file}")]
    DuplicateKind { file: PathBuf, kind: StructureKind },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Deserialize `content` in the given format. `file` only labels errors.
pub fn deserialize_str<T: DeserializeOwned>(
    content: &str,
    format: Format,
    file: &Path,
) -> Result<T, DataLoadError> {
    let parse_err = |detail: String| DataLoadError::Parse {
        file: file.to_path_buf(),
        detail,
    };
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
        Format::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format, path)
}

// ===========================================================================
// Public entry points
// ===========================================================================

/// Load and resolve a config file.
pub fn load_config(path: &Path) -> Result<SimConfig, DataLoadError> {
    let data: ConfigData = deserialize_file(path)?;
    let config = resolve_config(data, path)?;
    debug!(
        file = %path.display(),
        width = config.grid.width,
        height = config.grid.height,
        kinds = config.catalog.len(),
        "config loaded"
    );
    Ok(config)
}

/// Parse and resolve config text that did not come from a file.
pub fn config_from_str(content: &str, format: Format) -> Result<SimConfig, DataLoadError> {
    let label = Path::new("<inline>");
    let data: ConfigData = deserialize_str(content, format, label)?;
    resolve_config(data, label)
}

// ===========================================================================
// Resolution
// ===========================================================================

fn invalid(file: &Path, detail: impl Into<String>) -> DataLoadError {
    DataLoadError::Invalid {
        file: file.to_path_buf(),
        detail: detail.into(),
    }
}

fn non_negative(file: &Path, what: &str, v: f64) -> Result<f64, DataLoadError> {
    if v.is_finite() && v >= 0.0 {
        Ok(v)
    } else {
        Err(invalid(file, format!("{what} must be a non-negative number, got {v}")))
    }
}

/// A non-negative amount that fits the fixed-point range.
fn quantity(file: &Path, what: &str, v: f64) -> Result<Fixed64, DataLoadError> {
    let v = non_negative(file, what, v)?;
    Fixed64::checked_from_num(v)
        .ok_or_else(|| invalid(file, format!("{what} is too large, got {v}")))
}

fn amounts(file: &Path, what: &str, data: AmountsData) -> Result<ResourceAmounts, DataLoadError> {
    Ok(ResourceAmounts::new(
        quantity(file, what, data.gold)?,
        quantity(file, what, data.oil)?,
        quantity(file, what, data.crystal)?,
    ))
}

fn radius(file: &Path, what: &str, value: u32) -> Result<u32, DataLoadError> {
    if value > MAX_RADIUS {
        return Err(invalid(
            file,
            format!("{what} must be at most {MAX_RADIUS}, got {value}"),
        ));
    }
    Ok(value)
}

fn seconds_to_ticks(seconds: f64, ticks_per_second: u32) -> Ticks {
    (seconds * ticks_per_second as f64).round() as Ticks
}

fn resolve_structure(
    file: &Path,
    data: &StructureData,
    ticks_per_second: u32,
) -> Result<StructureSpec, DataLoadError> {
    let kind = data.kind;
    if data.footprint.width == 0 || data.footprint.height == 0 {
        return Err(invalid(file, format!("{kind:?} has an empty footprint")));
    }
    if data.max_hp == 0 {
        return Err(invalid(file, format!("{kind:?} needs max_hp above zero")));
    }
    let build = non_negative(file, "build_seconds", data.build_seconds)?;

    let generator = match &data.generator {
        Some(g) => Some(GeneratorSpec {
            fuel: g
                .fuel
                .map(|f| quantity(file, "generator fuel", f))
                .transpose()?,
            burn_per_second: quantity(file, "burn_per_second", g.burn_per_second)?,
        }),
        None => None,
    };
    let producer = match &data.producer {
        Some(p) => Some(ProducerSpec {
            output_per_second: quantity(file, "output_per_second", p.output_per_second)?,
            requires_power: p.requires_power,
        }),
        None => None,
    };
    let storage = match &data.storage {
        Some(s) => Some(StorageSpec {
            capacity: quantity(file, "storage capacity", s.capacity)?,
        }),
        None => None,
    };

    Ok(StructureSpec {
        footprint: Footprint::new(data.footprint.width, data.footprint.height),
        cost: amounts(file, "cost", data.cost)?,
        max_hp: data.max_hp,
        build_ticks: seconds_to_ticks(build, ticks_per_second),
        sight_radius: radius(file, "sight_radius", data.sight_radius)?,
        generator,
        producer,
        storage,
    })
}

/// Validate `data` and turn it into a runtime config. `file` only labels
/// errors.
pub fn resolve_config(data: ConfigData, file: &Path) -> Result<SimConfig, DataLoadError> {
    let defaults = SimConfig::default();

    if data.grid.width == 0 || data.grid.height == 0 {
        return Err(invalid(file, "grid dimensions must be positive"));
    }
    if !(data.grid.tile_size.is_finite() && data.grid.tile_size > 0.0) {
        return Err(invalid(file, "tile_size must be positive"));
    }
    let ticks_per_second = data.ticks_per_second.unwrap_or(defaults.ticks_per_second);
    if ticks_per_second == 0 {
        return Err(invalid(file, "ticks_per_second must be positive"));
    }

    let ratio = data.construction.sell_refund_ratio;
    if !(0.0..=1.0).contains(&ratio) {
        return Err(invalid(file, format!("sell_refund_ratio must be in [0, 1], got {ratio}")));
    }
    let margin = non_negative(file, "arrival_margin", data.construction.arrival_margin)?;

    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(data.units.size) || !positive(data.units.speed) {
        return Err(invalid(file, "unit size and speed must be positive"));
    }

    let terrains = if data.terrains.is_empty() {
        defaults.terrains
    } else {
        data.terrains
            .into_iter()
            .map(|t| TerrainDef {
                name: t.name,
                buildable: t.buildable,
                passable: t.passable,
                roofed: t.roofed,
            })
            .collect()
    };

    let mut catalog = defaults.catalog;
    let mut seen = BTreeSet::new();
    for structure in &data.structures {
        if !seen.insert(structure.kind) {
            return Err(DataLoadError::DuplicateKind {
                file: file.to_path_buf(),
                kind: structure.kind,
            });
        }
        let spec = resolve_structure(file, structure, ticks_per_second)?;
        catalog.insert(structure.kind, spec);
    }

    let starting_resources = match data.starting_resources {
        Some(a) => amounts(file, "starting_resources", a)?,
        None => defaults.starting_resources,
    };
    let storage_drain_per_second = match data.storage_drain_per_second {
        Some(v) => quantity(file, "storage_drain_per_second", v)?,
        None => defaults.storage_drain_per_second,
    };

    Ok(SimConfig {
        grid: GridConfig {
            width: data.grid.width,
            height: data.grid.height,
            tile_size: data.grid.tile_size as f32,
        },
        ticks_per_second,
        terrains,
        power: PowerConfig {
            base_halo_radius: radius(file, "base_halo_radius", data.power.base_halo_radius)?,
        },
        construction: ConstructionConfig {
            arrival_margin: margin as f32,
            sell_refund_ratio: Fixed64::from_num(ratio),
        },
        storage_drain_per_second,
        units: UnitDefaults {
            sight_radius: radius(file, "units.sight_radius", data.units.sight_radius)?,
            size: data.units.size as f32,
            speed: data.units.speed as f32,
            hp: data.units.hp,
        },
        starting_resources,
        catalog,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a unique temporary directory for a test.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bastion_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    fn fx(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("world.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("world.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("world.json")).unwrap(), Format::Json);
        assert!(matches!(
            detect_format(Path::new("world.yaml")),
            Err(DataLoadError::UnsupportedFormat { .. })
        ));
        assert!(detect_format(Path::new("world")).is_err());
    }

    // -----------------------------------------------------------------------
    // load_config per format
    // -----------------------------------------------------------------------

    #[test]
    fn load_ron_config() {
        let dir = make_test_dir("load_ron");
        let path = dir.join("world.ron");
        fs::write(
            &path,
            r#"(
    grid: (width: 20, height: 10, tile_size: 1.0),
    ticks_per_second: 10,
    structures: [
        (
            kind: storage,
            max_hp: 80,
            build_seconds: 1.5,
            storage: Some((capacity: 100.0)),
        ),
    ],
)"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.grid.width, 20);
        assert_eq!(config.grid.height, 10);
        assert_eq!(config.ticks_per_second, 10);
        let storage = config.catalog.get(StructureKind::Storage).unwrap();
        assert_eq!(storage.max_hp, 80);
        assert_eq!(storage.build_ticks, 15);
        assert_eq!(storage.footprint, Footprint::single());
        assert_eq!(storage.storage.as_ref().unwrap().capacity, fx(100.0));

        cleanup(&dir);
    }

    #[test]
    fn load_toml_config() {
        let dir = make_test_dir("load_toml");
        let path = dir.join("world.toml");
        fs::write(
            &path,
            r#"
ticks_per_second = 4
storage_drain_per_second = 2.0

[grid]
width = 12
height = 12

[construction]
sell_refund_ratio = 0.25

[starting_resources]
gold = 300.0
oil = 50.0

[[terrains]]
name = "grass"

[[terrains]]
name = "water"
buildable = false
passable = false

[[structures]]
kind = "gold_mine"
max_hp = 150
footprint = { width = 2, height = 1 }
cost = { gold = 75.0 }

[structures.producer]
output_per_second = 3.0
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.ticks_per_second, 4);
        assert_eq!(config.storage_drain_per_tick(), fx(0.5));
        assert_eq!(config.grid.tile_size, 32.0, "unset fields keep defaults");
        assert_eq!(config.construction.sell_refund_ratio, fx(0.25));
        assert_eq!(config.construction.arrival_margin, 4.0);
        assert_eq!(config.starting_resources, ResourceAmounts::new(fx(300.0), fx(50.0), fx(0.0)));
        assert_eq!(config.terrains.len(), 2);
        assert!(config.terrains[0].buildable && config.terrains[0].passable);
        assert!(!config.terrains[1].buildable && !config.terrains[1].passable);

        let mine = config.catalog.get(StructureKind::GoldMine).unwrap();
        assert_eq!(mine.footprint, Footprint::new(2, 1));
        assert_eq!(mine.cost.gold, fx(75.0));
        let producer = mine.producer.as_ref().unwrap();
        assert_eq!(producer.output_per_second, fx(3.0));
        assert!(!producer.requires_power);

        cleanup(&dir);
    }

    #[test]
    fn load_json_config() {
        let dir = make_test_dir("load_json");
        let path = dir.join("world.json");
        fs::write(
            &path,
            r#"{
  "power": { "base_halo_radius": 0 },
  "units": { "sight_radius": 3 },
  "structures": [
    { "kind": "generator", "max_hp": 10,
      "generator": { "fuel": null, "burn_per_second": 0.0 } }
  ]
}"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.power.base_halo_radius, 0);
        assert_eq!(config.units.sight_radius, 3);
        assert_eq!(config.units.hp, 100);
        let generator = config.catalog.get(StructureKind::Generator).unwrap();
        assert_eq!(generator.generator.as_ref().unwrap().fuel, None);

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Defaults and overrides
    // -----------------------------------------------------------------------

    #[test]
    fn empty_file_is_default_config() {
        let config = config_from_str("{}", Format::Json).unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn unlisted_kinds_keep_standard_spec() {
        let text = r#"
[[structures]]
kind = "turret"
max_hp = 1
"#;
        let config = config_from_str(text, Format::Toml).unwrap();
        let standard = SimConfig::default().catalog;
        assert_eq!(config.catalog.len(), standard.len());
        assert_eq!(config.catalog.get(StructureKind::Turret).unwrap().max_hp, 1);
        assert_eq!(
            config.catalog.get(StructureKind::Base),
            standard.get(StructureKind::Base)
        );
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    #[test]
    fn zero_grid_is_invalid() {
        let result = config_from_str(r#"{"grid": {"width": 0}}"#, Format::Json);
        assert!(matches!(result, Err(DataLoadError::Invalid { .. })));
    }

    #[test]
    fn empty_footprint_is_invalid() {
        let text = r#"{"structures": [{"kind": "turret", "max_hp": 5,
            "footprint": {"width": 0, "height": 1}}]}"#;
        let err = config_from_str(text, Format::Json).unwrap_err();
        assert!(err.to_string().contains("empty footprint"), "{err}");
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let text = r#"{"structures": [
            {"kind": "turret", "max_hp": 5},
            {"kind": "turret", "max_hp": 6}
        ]}"#;
        let result = config_from_str(text, Format::Json);
        assert!(matches!(
            result,
            Err(DataLoadError::DuplicateKind { kind: StructureKind::Turret, .. })
        ));
    }

    #[test]
    fn unknown_kind_is_parse_error() {
        let text = r#"{"structures": [{"kind": "castle", "max_hp": 5}]}"#;
        let result = config_from_str(text, Format::Json);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
    }

    #[test]
    fn refund_ratio_out_of_range() {
        let result = config_from_str(r#"{"construction": {"sell_refund_ratio": 1.5}}"#, Format::Json);
        assert!(matches!(result, Err(DataLoadError::Invalid { .. })));
    }

    #[test]
    fn negative_cost_is_invalid() {
        let text = r#"{"structures": [{"kind": "turret", "max_hp": 5, "cost": {"gold": -1.0}}]}"#;
        assert!(config_from_str(text, Format::Json).is_err());
    }

    #[test]
    fn amount_beyond_fixed_range_is_invalid() {
        let dir = make_test_dir("huge_amount");
        let path = dir.join("huge.toml");
        fs::write(&path, "[starting_resources]\ngold = 3000000000.0\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, DataLoadError::Invalid { .. }));
        assert!(err.to_string().contains("too large"), "{err}");

        let text = r#"{"structures": [{"kind": "storage", "max_hp": 5,
            "storage": {"capacity": 1e12}}]}"#;
        assert!(matches!(
            config_from_str(text, Format::Json),
            Err(DataLoadError::Invalid { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn largest_fitting_amount_is_accepted() {
        let config = config_from_str(r#"{"storage_drain_per_second": 2000000000.0}"#, Format::Json)
            .unwrap();
        assert_eq!(config.storage_drain_per_second, Fixed64::from_num(2_000_000_000));
    }

    #[test]
    fn oversized_radius_is_invalid() {
        for text in [
            r#"{"units": {"sight_radius": 50000}}"#,
            r#"{"power": {"base_halo_radius": 50000}}"#,
            r#"{"structures": [{"kind": "turret", "max_hp": 5, "sight_radius": 50000}]}"#,
        ] {
            let err = config_from_str(text, Format::Json).unwrap_err();
            assert!(err.to_string().contains("at most"), "{err}");
        }
        let config = config_from_str(r#"{"units": {"sight_radius": 1024}}"#, Format::Json).unwrap();
        assert_eq!(config.units.sight_radius, MAX_RADIUS);
    }

    // -----------------------------------------------------------------------
    // Errors
    // -----------------------------------------------------------------------

    #[test]
    fn missing_file_is_io_error() {
        let dir = make_test_dir("missing");
        let result = load_config(&dir.join("absent.toml"));
        assert!(matches!(result, Err(DataLoadError::Io(_))));
        cleanup(&dir);
    }

    #[test]
    fn parse_error_names_file() {
        let dir = make_test_dir("parse_err");
        let path = dir.join("broken.ron");
        fs::write(&path, "(grid: ").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { .. }));
        assert!(err.to_string().contains("broken.ron"));

        cleanup(&dir);
    }
}
