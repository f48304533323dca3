//! Per-kind structure definitions.
//!
//! The catalog is frozen once the world is created. Rates are expressed per
//! second here and converted to per-tick values when a structure is
//! instantiated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fixed::{Fixed64, Ticks};
use crate::grid::Footprint;
use crate::resource::ResourceAmounts;
use crate::structure::StructureKind;

/// Fuel behaviour of a power source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorSpec {
    /// Starting (and maximum) fuel. `None` means the source is always active.
    pub fuel: Option<Fixed64>,
    pub burn_per_second: Fixed64,
}

/// Output of a resource-extraction structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerSpec {
    pub output_per_second: Fixed64,
    pub requires_power: bool,
}

/// Buffer size of a storage hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSpec {
    /// Maximum buffered total across all resource kinds.
    pub capacity: Fixed64,
}

/// Everything needed to instantiate one structure kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureSpec {
    pub footprint: Footprint,
    pub cost: ResourceAmounts,
    pub max_hp: u32,
    pub build_ticks: Ticks,
    pub sight_radius: u32,
    pub generator: Option<GeneratorSpec>,
    pub producer: Option<ProducerSpec>,
    pub storage: Option<StorageSpec>,
}

impl StructureSpec {
    /// A plain 1x1 spec with no special behaviour.
    pub fn basic(cost: ResourceAmounts, max_hp: u32, build_ticks: Ticks) -> Self {
        Self {
            footprint: Footprint::single(),
            cost,
            max_hp,
            build_ticks,
            sight_radius: 1,
            generator: None,
            producer: None,
            storage: None,
        }
    }
}

/// Specs keyed by structure kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureCatalog {
    specs: BTreeMap<StructureKind, StructureSpec>,
}

impl StructureCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default specs for every structure kind.
    pub fn standard() -> Self {
        let gold = |v: i32| ResourceAmounts::gold(Fixed64::from_num(v));
        let mut catalog = Self::new();

        catalog.insert(
            StructureKind::Base,
            StructureSpec {
                footprint: Footprint::new(2, 2),
                sight_radius: 8,
                ..StructureSpec::basic(ResourceAmounts::ZERO, 2000, 0)
            },
        );
        catalog.insert(
            StructureKind::Generator,
            StructureSpec {
                footprint: Footprint::new(2, 2),
                sight_radius: 3,
                generator: Some(GeneratorSpec {
                    fuel: Some(Fixed64::from_num(600)),
                    burn_per_second: Fixed64::from_num(1),
                }),
                ..StructureSpec::basic(gold(150), 400, 200)
            },
        );
        catalog.insert(
            StructureKind::PowerLine,
            StructureSpec::basic(gold(10), 50, 20),
        );
        catalog.insert(
            StructureKind::Pipeline,
            StructureSpec::basic(gold(10), 50, 20),
        );
        catalog.insert(
            StructureKind::Turret,
            StructureSpec {
                sight_radius: 6,
                ..StructureSpec::basic(gold(100), 300, 100)
            },
        );
        catalog.insert(
            StructureKind::Storage,
            StructureSpec {
                footprint: Footprint::new(2, 2),
                sight_radius: 3,
                storage: Some(StorageSpec {
                    capacity: Fixed64::from_num(500),
                }),
                ..StructureSpec::basic(gold(120), 500, 150)
            },
        );
        catalog.insert(
            StructureKind::GoldMine,
            StructureSpec {
                footprint: Footprint::new(2, 2),
                sight_radius: 3,
                producer: Some(ProducerSpec {
                    output_per_second: Fixed64::from_num(2),
                    requires_power: false,
                }),
                ..StructureSpec::basic(gold(200), 400, 200)
            },
        );
        catalog.insert(
            StructureKind::OilPump,
            StructureSpec {
                sight_radius: 3,
                producer: Some(ProducerSpec {
                    output_per_second: Fixed64::from_num(1),
                    requires_power: true,
                }),
                ..StructureSpec::basic(gold(150), 300, 150)
            },
        );

        catalog
    }

    pub fn get(&self, kind: StructureKind) -> Option<&StructureSpec> {
        self.specs.get(&kind)
    }

    pub fn insert(&mut self, kind: StructureKind, spec: StructureSpec) {
        self.specs.insert(kind, spec);
    }

    pub fn iter(&self) -> impl Iterator<Item = (StructureKind, &StructureSpec)> {
        self.specs.iter().map(|(k, s)| (*k, s))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}
