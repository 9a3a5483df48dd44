use std::collections::BTreeMap;

use super::procedure::Procedure;

/// Immutable map of dotted procedure paths to procedures.
///
/// Composed once at startup; `nest` prefixes every child path with
/// `<prefix>.` so `investor` + `getById` resolves as `investor.getById`.
#[derive(Clone, Debug, Default)]
pub struct RpcRouter {
    procedures: BTreeMap<String, Procedure>,
}

impl RpcRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a procedure. Panics on a duplicate path, which is a wiring bug.
    pub fn procedure(mut self, name: &str, procedure: Procedure) -> Self {
        assert!(
            !name.is_empty() && !name.contains(','),
            "invalid procedure name '{}'",
            name
        );
        if self.procedures.insert(name.to_string(), procedure).is_some() {
            panic!("procedure '{}' registered twice", name);
        }
        self
    }

    pub fn nest(mut self, prefix: &str, child: RpcRouter) -> Self {
        for (name, procedure) in child.procedures {
            let path = format!("{}.{}", prefix, name);
            if self.procedures.insert(path.clone(), procedure).is_some() {
                panic!("procedure '{}' registered twice", path);
            }
        }
        self
    }

    pub fn resolve(&self, path: &str) -> Option<&Procedure> {
        self.procedures.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.procedures.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::procedure::{public_procedure, ProcedureKind};
    use crate::rpc::schema::NoInput;

    fn ping() -> Procedure {
        public_procedure().query(|_ctx, _input: NoInput| async move { Ok("pong".to_string()) })
    }

    #[test]
    fn nests_with_dotted_paths() {
        let inner = RpcRouter::new().procedure("ping", ping());
        let router = RpcRouter::new()
            .nest("health", inner.clone())
            .nest("admin", RpcRouter::new().nest("tools", inner));

        let paths: Vec<&str> = router.paths().collect();
        assert_eq!(paths, vec!["admin.tools.ping", "health.ping"]);
        assert_eq!(router.resolve("health.ping").map(|p| p.kind()), Some(ProcedureKind::Query));
        assert!(router.resolve("health").is_none());
        assert!(router.resolve("ping").is_none());
    }

    #[test]
    #[should_panic(expected = "registered twice")]
    fn duplicate_paths_panic() {
        RpcRouter::new().procedure("ping", ping()).procedure("ping", ping());
    }
}
