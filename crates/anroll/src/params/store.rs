use std::ops::{BitOr, BitOrAssign};

use super::{Param, ParamGroup, ParamKey, Parameters};

/// Derived artifacts invalidated by a set of parameter changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dirty {
    /// Refit both contour splines.
    pub splines: bool,
    /// Recompute height and arc crop windows.
    pub bounds: bool,
    /// Refit the straight-line approximation.
    pub linear_fit: bool,
    /// Recompute blend shape bounds.
    pub shape_bounds: bool,
    /// Re-derive the blend coefficients.
    pub blend: bool,
    /// Any change the transform observes; also arms the auto-optimizer.
    pub mapping: bool,
    pub image: bool,
    pub grid: bool,
    pub errors: bool,
}

impl Dirty {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::none()
    }

    /// Everything downstream of the transform.
    fn remap_all() -> Self {
        Self {
            mapping: true,
            image: true,
            grid: true,
            errors: true,
            ..Self::none()
        }
    }

    pub fn for_group(group: ParamGroup) -> Self {
        match group {
            ParamGroup::Fit => Self {
                splines: true,
                bounds: true,
                linear_fit: true,
                shape_bounds: true,
                blend: true,
                ..Self::remap_all()
            },
            ParamGroup::Crop => Self {
                bounds: true,
                linear_fit: true,
                shape_bounds: true,
                blend: true,
                ..Self::remap_all()
            },
            ParamGroup::Target => Self {
                shape_bounds: true,
                blend: true,
                ..Self::remap_all()
            },
            ParamGroup::Shape => Self {
                blend: true,
                ..Self::remap_all()
            },
            ParamGroup::Mapping | ParamGroup::Optimizer => Self::remap_all(),
            ParamGroup::Image => Self {
                image: true,
                ..Self::none()
            },
            ParamGroup::Grid => Self {
                grid: true,
                ..Self::none()
            },
            ParamGroup::Errors => Self {
                errors: true,
                ..Self::none()
            },
        }
    }
}

impl BitOr for Dirty {
    type Output = Dirty;

    fn bitor(self, o: Dirty) -> Dirty {
        Dirty {
            splines: self.splines | o.splines,
            bounds: self.bounds | o.bounds,
            linear_fit: self.linear_fit | o.linear_fit,
            shape_bounds: self.shape_bounds | o.shape_bounds,
            blend: self.blend | o.blend,
            mapping: self.mapping | o.mapping,
            image: self.image | o.image,
            grid: self.grid | o.grid,
            errors: self.errors | o.errors,
        }
    }
}

impl BitOrAssign for Dirty {
    fn bitor_assign(&mut self, o: Dirty) {
        *self = *self | o;
    }
}

/// Snapshot of the per-group change counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupVersions([u64; ParamGroup::COUNT]);

impl GroupVersions {
    pub fn get(&self, group: ParamGroup) -> u64 {
        self.0[group.index()]
    }
}

/// Current parameter values with version counters.
///
/// Every effective write bumps the counter of the parameter and of its group.
/// Consumers remember a [`GroupVersions`] snapshot and ask for the
/// [`Dirty`] set accumulated since.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    values: Parameters,
    param_versions: [u64; ParamKey::COUNT],
    group_versions: GroupVersions,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new(Parameters::default())
    }
}

impl ParameterStore {
    pub fn new(values: Parameters) -> Self {
        Self {
            values,
            param_versions: [0; ParamKey::COUNT],
            group_versions: GroupVersions::default(),
        }
    }

    pub fn values(&self) -> &Parameters {
        &self.values
    }

    /// Apply one write. Writing the current value is a no-op.
    pub fn set(&mut self, param: Param) -> Dirty {
        if !param.apply(&mut self.values) {
            return Dirty::none();
        }
        let key = param.key();
        self.param_versions[key.index()] += 1;
        self.group_versions.0[key.group().index()] += 1;
        tracing::trace!(name = key.name(), value = %param.value(), "parameter changed");
        Dirty::for_group(key.group())
    }

    pub fn set_many(&mut self, params: impl IntoIterator<Item = Param>) -> Dirty {
        params
            .into_iter()
            .fold(Dirty::none(), |acc, p| acc | self.set(p))
    }

    /// Number of effective writes to `key` so far.
    pub fn version(&self, key: ParamKey) -> u64 {
        self.param_versions[key.index()]
    }

    pub fn versions(&self) -> GroupVersions {
        self.group_versions
    }

    /// Union of [`Dirty`] sets of every group written since `consumed`.
    pub fn changed_since(&self, consumed: &GroupVersions) -> Dirty {
        ParamGroup::ALL
            .iter()
            .filter(|g| self.group_versions.get(**g) != consumed.get(**g))
            .fold(Dirty::none(), |acc, g| acc | Dirty::for_group(*g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_writes_do_not_bump_versions() {
        let mut store = ParameterStore::default();
        let same = Param::float(ParamKey::InterpolationTarget, 0.5).unwrap();
        assert!(store.set(same).is_empty());
        assert_eq!(store.version(ParamKey::InterpolationTarget), 0);

        let moved = Param::float(ParamKey::InterpolationTarget, 0.7).unwrap();
        let dirty = store.set(moved);
        assert!(dirty.shape_bounds && dirty.blend && dirty.mapping);
        assert!(!dirty.splines && !dirty.bounds);
        assert_eq!(store.version(ParamKey::InterpolationTarget), 1);
        assert_eq!(store.versions().get(ParamGroup::Target), 1);
    }

    #[test]
    fn changed_since_accumulates_until_consumed() {
        let mut store = ParameterStore::default();
        let consumed = store.versions();
        store.set(Param::float(ParamKey::ImageRotation, 0.25).unwrap());
        let dirty = store.changed_since(&consumed);
        assert_eq!(
            dirty,
            Dirty {
                image: true,
                ..Dirty::none()
            }
        );

        store.set(Param::float(ParamKey::CropTop, 0.1).unwrap());
        let dirty = store.changed_since(&consumed);
        assert!(dirty.image && dirty.bounds && dirty.linear_fit && dirty.grid);

        let consumed = store.versions();
        assert!(store.changed_since(&consumed).is_empty());
    }

    #[test]
    fn set_many_unions_dirty_sets() {
        let mut store = ParameterStore::default();
        let dirty = store.set_many([
            Param::float(ParamKey::GridX, 4.0).unwrap(),
            Param::float(ParamKey::ErrorMapQuality, 0.5).unwrap(),
        ]);
        assert!(dirty.grid && dirty.errors);
        assert!(!dirty.image && !dirty.mapping);
        assert_eq!(store.values().grid_x, 4);
    }
}
