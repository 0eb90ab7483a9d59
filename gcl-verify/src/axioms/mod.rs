//! Axiom registry.
//!
//! An axiom is a block of background definitions in prover syntax, optionally
//! paired with a trigger that rewrites the matching quantified idiom into the
//! function the definitions describe. Definition-only axioms can be added
//! from `*.ax` files; `array-sum.ax` is addressed as `ARRAY_SUM`.

mod builtin;
mod range;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::error::{AxiomDirError, LowerError};
use crate::lower::{AxiomTrigger, Lowering};

pub use builtin::{
    ArrayContains, ArrayPerm, ArrayProd, ArraySum, MatrixSum, RowOnColDotprod, RowOnVecDotprod,
};
pub use range::{Bounds, array_indexed_by, double_select, parse_range, single_select};

pub struct Axiom {
    name: String,
    definition: String,
    trigger: Option<Box<dyn AxiomTrigger>>,
}

impl Axiom {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            trigger: None,
        }
    }

    pub fn with_trigger(mut self, trigger: impl AxiomTrigger + 'static) -> Self {
        self.trigger = Some(Box::new(trigger));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn has_trigger(&self) -> bool {
        self.trigger.is_some()
    }
}

impl std::fmt::Debug for Axiom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Axiom")
            .field("name", &self.name)
            .field("has_trigger", &self.has_trigger())
            .finish()
    }
}

/// `array-sum` → `ARRAY_SUM`
pub fn axiom_name(file_stem: &str) -> String {
    file_stem.replace('-', "_").to_uppercase()
}

#[derive(Debug, Default)]
pub struct AxiomRegistry {
    axioms: BTreeMap<String, Axiom>,
}

impl AxiomRegistry {
    /// Registry holding the built-in axioms.
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        for axiom in builtin::all() {
            registry.register(axiom);
        }
        registry
    }

    /// Adds or replaces an axiom; returns the one it replaced.
    pub fn register(&mut self, axiom: Axiom) -> Option<Axiom> {
        self.axioms.insert(axiom.name.clone(), axiom)
    }

    /// Loads every `*.ax` file in `dir` as a definition-only axiom. A file
    /// named after a registered axiom replaces its definition and keeps its
    /// trigger. Returns the names loaded.
    pub fn load_dir(&mut self, dir: &Path) -> Result<Vec<String>, AxiomDirError> {
        let err = |source| AxiomDirError {
            path: dir.to_path_buf(),
            source,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(err)? {
            let path = entry.map_err(err)?.path();
            if path.extension().is_some_and(|ext| ext == "ax") {
                files.push(path);
            }
        }
        files.sort();

        let mut loaded = Vec::new();
        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = axiom_name(stem);
            let definition = std::fs::read_to_string(&path).map_err(err)?;
            debug!(axiom = %name, path = %path.display(), "loaded axiom definition");
            match self.axioms.get_mut(&name) {
                Some(existing) => existing.definition = definition,
                None => {
                    self.register(Axiom::new(name.clone(), definition));
                }
            }
            loaded.push(name);
        }
        Ok(loaded)
    }

    pub fn get(&self, name: &str) -> Option<&Axiom> {
        self.axioms.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Axiom> {
        self.axioms.values()
    }

    /// Resolves the requested names, in request order, without duplicates.
    pub fn enable<S: AsRef<str>>(&self, names: &[S]) -> Result<EnabledAxioms<'_>, LowerError> {
        let mut axioms: Vec<&Axiom> = Vec::new();
        for name in names {
            let name = name.as_ref();
            let axiom = self
                .axioms
                .get(name)
                .ok_or_else(|| LowerError::UnknownAxiom(name.to_string()))?;
            if !axioms.iter().any(|a| a.name == axiom.name) {
                axioms.push(axiom);
            }
        }
        Ok(EnabledAxioms { axioms })
    }
}

/// The axioms enabled for one request.
#[derive(Debug, Default)]
pub struct EnabledAxioms<'r> {
    axioms: Vec<&'r Axiom>,
}

impl<'r> EnabledAxioms<'r> {
    pub fn names(&self) -> impl Iterator<Item = &'r str> + '_ {
        self.axioms.iter().map(|a| a.name.as_str())
    }

    pub fn definitions(&self) -> impl Iterator<Item = &'r str> + '_ {
        self.axioms.iter().map(|a| a.definition.as_str())
    }

    pub fn lowering(&self) -> Lowering<'r> {
        Lowering::new(
            self.axioms
                .iter()
                .filter_map(|a| a.trigger.as_deref())
                .map(|t| t as &dyn AxiomTrigger)
                .collect(),
        )
    }
}
