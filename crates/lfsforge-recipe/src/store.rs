use std::collections::{HashMap, HashSet, VecDeque};

use camino::Utf8Path;
use lfsforge_core::LoadError;
use serde::Deserialize;

use crate::model::Recipe;

/// Loads, indexes, and resolves recipe documents by package name
///. `name` is the registration key across the fleet.
#[derive(Debug, Default)]
pub struct RecipeStore {
    recipes: HashMap<String, Recipe>,
}

impl RecipeStore {
    /// Load every `*.yml`/`*.yaml` file directly under `dir`. A single
    /// file may hold one recipe document, a YAML sequence of recipes, or
    /// several `---`-separated recipe documents.
    pub fn load_dir(dir: &Utf8Path) -> Result<Self, LoadError> {
        let mut recipes = HashMap::new();

        let mut entries: Vec<_> = std::fs::read_dir(dir.as_std_path())?
            .collect::<Result<Vec<_>, std::io::Error>>()?;
        entries.sort_by_key(|e| e.path());

        for entry in entries {
            let path = entry.path();
            let is_recipe_file = path
                .extension()
                .is_some_and(|ext| ext == "yml" || ext == "yaml");
            if !is_recipe_file {
                continue;
            }

            let text = std::fs::read_to_string(&path)?;
            for recipe in parse_recipes(&text, &path.display().to_string())? {
                let name = recipe.name.clone();
                if recipes.insert(name.clone(), recipe).is_some() {
                    return Err(LoadError::DuplicateRecipe(name));
                }
            }
        }

        let store = Self { recipes };
        store.validate_dependencies()?;
        Ok(store)
    }

    fn validate_dependencies(&self) -> Result<(), LoadError> {
        for recipe in self.recipes.values() {
            for dep in &recipe.depends {
                if !self.recipes.contains_key(dep) {
                    return Err(LoadError::UnresolvedDependency {
                        name: recipe.name.clone(),
                        depends_on: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn find(&self, name: &str) -> Result<&Recipe, LoadError> {
        self.recipes
            .get(name)
            .ok_or_else(|| LoadError::RecipeNotFound(name.to_string()))
    }

    pub fn all(&self) -> Vec<&Recipe> {
        let mut all: Vec<&Recipe> = self.recipes.values().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Topological order over `subset` by Kahn's algorithm: edges are
    /// `depends[]` entries that are themselves members of `subset`
    /// (dependencies outside the requested subset are assumed already
    /// satisfied). Detects both self-cycles and longer cycles.
    pub fn topological(&self, subset: &[String]) -> Result<Vec<&Recipe>, LoadError> {
        let names: HashSet<&str> = subset.iter().map(String::as_str).collect();

        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for name in &names {
            in_degree.insert(name, 0);
        }

        for name in &names {
            let recipe = self.find(name)?;
            for dep in &recipe.depends {
                if names.contains(dep.as_str()) {
                    *in_degree.entry(name).or_insert(0) += 1;
                    dependents.entry(dep.as_str()).or_default().push(name);
                }
            }
        }

        // Deterministic ordering among independent roots.
        let mut roots: Vec<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(name, _)| *name)
            .collect();
        roots.sort();
        let mut queue: VecDeque<&str> = roots.into();

        let mut ordered = Vec::with_capacity(names.len());
        while let Some(name) = queue.pop_front() {
            ordered.push(name);
            if let Some(deps) = dependents.get(name) {
                let mut newly_ready = Vec::new();
                for dep in deps {
                    if let Some(degree) = in_degree.get_mut(dep) {
                        *degree -= 1;
                        if *degree == 0 {
                            newly_ready.push(*dep);
                        }
                    }
                }
                newly_ready.sort();
                for r in newly_ready {
                    queue.push_back(r);
                }
            }
        }

        if ordered.len() != names.len() {
            let remaining: Vec<&str> = names
                .iter()
                .filter(|n| !ordered.contains(n))
                .copied()
                .collect();
            let mut remaining = remaining;
            remaining.sort();
            return Err(LoadError::CycleDetected {
                cycle: remaining.join(", "),
            });
        }

        ordered
            .into_iter()
            .map(|name| self.find(name))
            .collect()
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RecipeDoc {
    Many(Vec<Recipe>),
    One(Recipe),
}

fn parse_recipes(text: &str, path: &str) -> Result<Vec<Recipe>, LoadError> {
    let mut recipes = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let doc = RecipeDoc::deserialize(document).map_err(|e| LoadError::SchemaError {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        match doc {
            RecipeDoc::One(r) => recipes.push(r),
            RecipeDoc::Many(rs) => recipes.extend(rs),
        }
    }
    Ok(recipes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_recipe(dir: &std::path::Path, filename: &str, yaml: &str) {
        std::fs::write(dir.join(filename), yaml).unwrap();
    }

    #[test]
    fn loads_single_recipe_per_file() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "binutils.yml",
            "name: binutils\nversion: \"2.43\"\n",
        );
        let utf8_dir = Utf8Path::from_path(dir.path()).unwrap();
        let store = RecipeStore::load_dir(utf8_dir).unwrap();
        assert_eq!(store.find("binutils").unwrap().version, "2.43");
    }

    #[test]
    fn loads_multiple_recipes_from_one_yaml_sequence() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "toolchain.yml",
            "- name: binutils\n  version: \"2.43\"\n- name: gcc\n  version: \"14.2.0\"\n  depends: [binutils]\n",
        );
        let utf8_dir = Utf8Path::from_path(dir.path()).unwrap();
        let store = RecipeStore::load_dir(utf8_dir).unwrap();
        assert_eq!(store.all().len(), 2);
    }

    #[test]
    fn unresolved_dependency_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "gcc.yml",
            "name: gcc\nversion: \"14.2.0\"\ndepends: [binutils]\n",
        );
        let utf8_dir = Utf8Path::from_path(dir.path()).unwrap();
        let err = RecipeStore::load_dir(utf8_dir).unwrap_err();
        assert!(matches!(err, LoadError::UnresolvedDependency { .. }));
    }

    #[test]
    fn topological_orders_predecessors_before_dependents() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "fleet.yml",
            "- name: binutils\n  version: \"1\"\n\
             - name: gcc\n  version: \"1\"\n  depends: [binutils]\n\
             - name: glibc\n  version: \"1\"\n  depends: [gcc, binutils]\n",
        );
        let utf8_dir = Utf8Path::from_path(dir.path()).unwrap();
        let store = RecipeStore::load_dir(utf8_dir).unwrap();

        let subset = vec!["glibc".to_string(), "gcc".to_string(), "binutils".to_string()];
        let ordered = store.topological(&subset).unwrap();
        let positions: HashMap<&str, usize> = ordered
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.as_str(), i))
            .collect();
        assert!(positions["binutils"] < positions["gcc"]);
        assert!(positions["gcc"] < positions["glibc"]);
    }

    #[test]
    fn detects_self_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "a.yml",
            "name: a\nversion: \"1\"\ndepends: [a]\n",
        );
        // Self-dependency makes validate_dependencies pass (a resolves to
        // itself) but topological must still detect the cycle.
        let utf8_dir = Utf8Path::from_path(dir.path()).unwrap();
        let store = RecipeStore::load_dir(utf8_dir).unwrap();
        let err = store.topological(&["a".to_string()]).unwrap_err();
        assert!(matches!(err, LoadError::CycleDetected { .. }));
    }

    #[test]
    fn detects_longer_cycle() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "cycle.yml",
            "- name: a\n  version: \"1\"\n  depends: [b]\n\
             - name: b\n  version: \"1\"\n  depends: [a]\n",
        );
        let utf8_dir = Utf8Path::from_path(dir.path()).unwrap();
        let store = RecipeStore::load_dir(utf8_dir).unwrap();
        let err = store
            .topological(&["a".to_string(), "b".to_string()])
            .unwrap_err();
        assert!(matches!(err, LoadError::CycleDetected { .. }));
    }

    #[test]
    fn duplicate_recipe_name_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        write_recipe(
            dir.path(),
            "dup.yml",
            "- name: gcc\n  version: \"1\"\n- name: gcc\n  version: \"2\"\n",
        );
        let utf8_dir = Utf8Path::from_path(dir.path()).unwrap();
        let err = RecipeStore::load_dir(utf8_dir).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateRecipe(_)));
    }
}
