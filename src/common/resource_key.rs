use std::fmt::Display;

use super::Scope;

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Location {
    #[default]
    Global,
    Region(String),
    Zone(String),
}

impl Location {
    pub fn scope(&self) -> Scope {
        match self {
            Location::Global => Scope::Global,
            Location::Region(_) => Scope::Regional,
            Location::Zone(_) => Scope::Zonal,
        }
    }

    /// Path segment of a self link, `global`, `regions/<r>` or `zones/<z>`.
    pub fn path(&self) -> String {
        match self {
            Location::Global => "global".to_owned(),
            Location::Region(region) => format!("regions/{region}"),
            Location::Zone(zone) => format!("zones/{zone}"),
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Identifies one resource instance within a project.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceKey {
    pub name: String,
    pub location: Location,
}

impl ResourceKey {
    pub fn global(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            location: Location::Global,
        }
    }

    pub fn regional(name: &str, region: &str) -> Self {
        Self {
            name: name.to_owned(),
            location: Location::Region(region.to_owned()),
        }
    }

    pub fn zonal(name: &str, zone: &str) -> Self {
        Self {
            name: name.to_owned(),
            location: Location::Zone(zone.to_owned()),
        }
    }

    /// Key for `name` at `scope`; regional keys are placed in `region`.
    pub fn for_scope(name: &str, scope: Scope, region: &str) -> Self {
        match scope {
            Scope::Regional => Self::regional(name, region),
            Scope::Global | Scope::Zonal => Self::global(name),
        }
    }

    pub fn scope(&self) -> Scope {
        self.location.scope()
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.location, self.name)
    }
}
