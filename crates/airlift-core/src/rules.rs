//! Static rewrite rules: import remaps and operator-parameter migrations.
//!
//! The tables are plain data, loaded once and never mutated during a run.
//! Callers inject a [`RuleTable`] into the migrator explicitly, so tests can
//! swap in alternate rule sets without touching global state.

use std::collections::{HashMap, HashSet};

use crate::error::MigrateError;

/// What to do with a deprecated keyword argument at a matched call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRule {
    Remove,
    RenameTo(String),
}

/// `from airflow.operators.bash_operator import BashOperator` and friends:
/// fully-qualified `module.Symbol` relocations between 1.10.x and 2.x.
const IMPORT_MAP: &[(&str, &str)] = &[
    (
        "airflow.operators.bash_operator.BashOperator",
        "airflow.operators.bash.BashOperator",
    ),
    (
        "airflow.operators.python_operator.PythonOperator",
        "airflow.operators.python.PythonOperator",
    ),
    (
        "airflow.operators.python_operator.BranchPythonOperator",
        "airflow.operators.python.BranchPythonOperator",
    ),
    (
        "airflow.operators.python_operator.ShortCircuitOperator",
        "airflow.operators.python.ShortCircuitOperator",
    ),
    (
        "airflow.operators.dummy_operator.DummyOperator",
        "airflow.operators.dummy.DummyOperator",
    ),
    (
        "airflow.operators.email_operator.EmailOperator",
        "airflow.operators.email.EmailOperator",
    ),
    (
        "airflow.operators.subdag_operator.SubDagOperator",
        "airflow.operators.subdag.SubDagOperator",
    ),
    (
        "airflow.operators.http_operator.SimpleHttpOperator",
        "airflow.providers.http.operators.http.SimpleHttpOperator",
    ),
    (
        "airflow.operators.postgres_operator.PostgresOperator",
        "airflow.providers.postgres.operators.postgres.PostgresOperator",
    ),
    (
        "airflow.operators.mysql_operator.MySqlOperator",
        "airflow.providers.mysql.operators.mysql.MySqlOperator",
    ),
    (
        "airflow.hooks.base_hook.BaseHook",
        "airflow.hooks.base.BaseHook",
    ),
    (
        "airflow.hooks.http_hook.HttpHook",
        "airflow.providers.http.hooks.http.HttpHook",
    ),
    (
        "airflow.hooks.postgres_hook.PostgresHook",
        "airflow.providers.postgres.hooks.postgres.PostgresHook",
    ),
    (
        "airflow.hooks.mysql_hook.MySqlHook",
        "airflow.providers.mysql.hooks.mysql.MySqlHook",
    ),
    (
        "airflow.hooks.S3_hook.S3Hook",
        "airflow.providers.amazon.aws.hooks.s3.S3Hook",
    ),
    (
        "airflow.sensors.external_task_sensor.ExternalTaskSensor",
        "airflow.sensors.external_task.ExternalTaskSensor",
    ),
    (
        "airflow.sensors.http_sensor.HttpSensor",
        "airflow.providers.http.sensors.http.HttpSensor",
    ),
    (
        "airflow.contrib.operators.bigquery_operator.BigQueryOperator",
        "airflow.providers.google.cloud.operators.bigquery.BigQueryOperator",
    ),
    (
        "airflow.contrib.operators.kubernetes_pod_operator.KubernetesPodOperator",
        "airflow.providers.cncf.kubernetes.operators.kubernetes_pod.KubernetesPodOperator",
    ),
    // Renamed symbols: the transformer aliases these back to the old name
    // when the import carried no alias, so call sites keep resolving.
    (
        "airflow.contrib.hooks.gcs_hook.GoogleCloudStorageHook",
        "airflow.providers.google.cloud.hooks.gcs.GCSHook",
    ),
    (
        "airflow.contrib.operators.gcs_to_gcs.GoogleCloudStorageToGoogleCloudStorageOperator",
        "airflow.providers.google.cloud.transfers.gcs_to_gcs.GCSToGCSOperator",
    ),
    (
        "airflow.contrib.sensors.gcs_sensor.GoogleCloudStorageObjectSensor",
        "airflow.providers.google.cloud.sensors.gcs.GCSObjectExistenceSensor",
    ),
];

/// Whole-module relocations, applied to `import X` statements and to
/// `from X import ...` symbols that have no entry in [`IMPORT_MAP`].
const MODULE_MAP: &[(&str, &str)] = &[
    ("airflow.operators.bash_operator", "airflow.operators.bash"),
    ("airflow.operators.python_operator", "airflow.operators.python"),
    ("airflow.operators.dummy_operator", "airflow.operators.dummy"),
    ("airflow.operators.email_operator", "airflow.operators.email"),
    ("airflow.operators.subdag_operator", "airflow.operators.subdag"),
    (
        "airflow.operators.http_operator",
        "airflow.providers.http.operators.http",
    ),
    (
        "airflow.operators.postgres_operator",
        "airflow.providers.postgres.operators.postgres",
    ),
    (
        "airflow.operators.mysql_operator",
        "airflow.providers.mysql.operators.mysql",
    ),
    ("airflow.hooks.base_hook", "airflow.hooks.base"),
    ("airflow.hooks.http_hook", "airflow.providers.http.hooks.http"),
    (
        "airflow.hooks.postgres_hook",
        "airflow.providers.postgres.hooks.postgres",
    ),
    (
        "airflow.hooks.mysql_hook",
        "airflow.providers.mysql.hooks.mysql",
    ),
    ("airflow.hooks.S3_hook", "airflow.providers.amazon.aws.hooks.s3"),
    (
        "airflow.sensors.external_task_sensor",
        "airflow.sensors.external_task",
    ),
    (
        "airflow.sensors.http_sensor",
        "airflow.providers.http.sensors.http",
    ),
    ("airflow.sensors.sql_sensor", "airflow.sensors.sql"),
    (
        "airflow.contrib.hooks.gcs_hook",
        "airflow.providers.google.cloud.hooks.gcs",
    ),
    (
        "airflow.contrib.hooks.bigquery_hook",
        "airflow.providers.google.cloud.hooks.bigquery",
    ),
    (
        "airflow.contrib.hooks.datastore_hook",
        "airflow.providers.google.cloud.hooks.datastore",
    ),
    (
        "airflow.contrib.operators.bigquery_operator",
        "airflow.providers.google.cloud.operators.bigquery",
    ),
    (
        "airflow.contrib.operators.bigquery_to_gcs",
        "airflow.providers.google.cloud.transfers.bigquery_to_gcs",
    ),
    (
        "airflow.contrib.operators.gcs_to_bq",
        "airflow.providers.google.cloud.transfers.gcs_to_bigquery",
    ),
    (
        "airflow.contrib.operators.gcs_to_gcs",
        "airflow.providers.google.cloud.transfers.gcs_to_gcs",
    ),
    (
        "airflow.contrib.operators.dataproc_operator",
        "airflow.providers.google.cloud.operators.dataproc",
    ),
    (
        "airflow.contrib.operators.dataflow_operator",
        "airflow.providers.google.cloud.operators.dataflow",
    ),
    (
        "airflow.contrib.operators.pubsub_operator",
        "airflow.providers.google.cloud.operators.pubsub",
    ),
    (
        "airflow.contrib.operators.kubernetes_pod_operator",
        "airflow.providers.cncf.kubernetes.operators.kubernetes_pod",
    ),
    (
        "airflow.contrib.sensors.gcs_sensor",
        "airflow.providers.google.cloud.sensors.gcs",
    ),
];

/// Keyword arguments dropped outright in 2.x. Context is always passed to
/// python callables in 2.x, so `provide_context` has no replacement.
const PARAM_REMOVALS: &[(&str, &str)] = &[
    ("BashOperator", "provide_context"),
    ("PythonOperator", "provide_context"),
    ("BranchPythonOperator", "provide_context"),
    ("ShortCircuitOperator", "provide_context"),
];

/// Keyword arguments that survive under a new name.
const PARAM_RENAMES: &[(&str, &str, &str)] = &[
    ("BashOperator", "xcom_push", "do_xcom_push"),
    ("SimpleHttpOperator", "xcom_push", "do_xcom_push"),
    ("KubernetesPodOperator", "xcom_push", "do_xcom_push"),
    ("BigQueryOperator", "bql", "sql"),
];

#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    import_map: HashMap<String, String>,
    module_map: HashMap<String, String>,
    parameter_rules: HashMap<(String, String), ParamRule>,
    known_classes: HashSet<String>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The embedded Airflow 1.10.x -> 2.x rule set.
    pub fn airflow() -> Self {
        let mut table = Self::from_pairs(IMPORT_MAP, MODULE_MAP, PARAM_REMOVALS, PARAM_RENAMES)
            .expect("embedded Airflow rule table is consistent");
        table.validate().expect("embedded Airflow rule table is idempotent");
        table
    }

    /// Build a table from raw pairs, rejecting duplicate keys that map to
    /// conflicting targets. This is the load-time `RuleConflict` check; it
    /// runs before any file is touched.
    pub fn from_pairs(
        imports: &[(&str, &str)],
        modules: &[(&str, &str)],
        removals: &[(&str, &str)],
        renames: &[(&str, &str, &str)],
    ) -> Result<Self, MigrateError> {
        let mut table = Self::new();
        for (old, new) in imports {
            table.insert_import(old, new)?;
        }
        for (old, new) in modules {
            table.insert_module(old, new)?;
        }
        for (class, param) in removals {
            table.insert_param(class, param, ParamRule::Remove)?;
        }
        for (class, param, new_name) in renames {
            table.insert_param(class, param, ParamRule::RenameTo((*new_name).to_string()))?;
        }
        Ok(table)
    }

    fn insert_import(&mut self, old: &str, new: &str) -> Result<(), MigrateError> {
        if let Some(existing) = self.import_map.get(old) {
            if existing != new {
                return Err(MigrateError::RuleConflict {
                    key: old.to_string(),
                    existing: existing.clone(),
                    replacement: new.to_string(),
                });
            }
            return Ok(());
        }
        self.import_map.insert(old.to_string(), new.to_string());
        Ok(())
    }

    fn insert_module(&mut self, old: &str, new: &str) -> Result<(), MigrateError> {
        if let Some(existing) = self.module_map.get(old) {
            if existing != new {
                return Err(MigrateError::RuleConflict {
                    key: old.to_string(),
                    existing: existing.clone(),
                    replacement: new.to_string(),
                });
            }
            return Ok(());
        }
        self.module_map.insert(old.to_string(), new.to_string());
        Ok(())
    }

    fn insert_param(&mut self, class: &str, param: &str, rule: ParamRule) -> Result<(), MigrateError> {
        let key = (class.to_string(), param.to_string());
        if let Some(existing) = self.parameter_rules.get(&key) {
            if *existing != rule {
                return Err(MigrateError::RuleConflict {
                    key: format!("{class}.{param}"),
                    existing: describe(existing),
                    replacement: describe(&rule),
                });
            }
            return Ok(());
        }
        self.known_classes.insert(class.to_string());
        self.parameter_rules.insert(key, rule);
        Ok(())
    }

    /// Chainable insert for tests and custom rule sets. Panics on conflict;
    /// use [`RuleTable::from_pairs`] when the input is not trusted.
    pub fn with_import(mut self, old: &str, new: &str) -> Self {
        self.insert_import(old, new).expect("conflicting import rule");
        self
    }

    pub fn with_module(mut self, old: &str, new: &str) -> Self {
        self.insert_module(old, new).expect("conflicting module rule");
        self
    }

    pub fn with_param(mut self, class: &str, param: &str, rule: ParamRule) -> Self {
        self.insert_param(class, param, rule).expect("conflicting parameter rule");
        self
    }

    /// Reject any mapping whose target is itself a key. A table that passes
    /// cannot produce output that a second pass would rewrite again, which
    /// is what makes the whole pipeline idempotent.
    pub fn validate(&self) -> Result<(), MigrateError> {
        for (key, target) in &self.import_map {
            if self.import_map.contains_key(target) {
                return Err(MigrateError::RuleNotIdempotent {
                    key: key.clone(),
                    target: target.clone(),
                });
            }
            if let Some((module, _)) = target.rsplit_once('.') {
                if self.module_map.contains_key(module) {
                    return Err(MigrateError::RuleNotIdempotent {
                        key: key.clone(),
                        target: module.to_string(),
                    });
                }
            }
        }
        for (key, target) in &self.module_map {
            if self.module_map.contains_key(target) {
                return Err(MigrateError::RuleNotIdempotent {
                    key: key.clone(),
                    target: target.clone(),
                });
            }
        }
        for ((class, param), rule) in &self.parameter_rules {
            if let ParamRule::RenameTo(new_name) = rule {
                let renamed = (class.clone(), new_name.clone());
                if self.parameter_rules.contains_key(&renamed) {
                    return Err(MigrateError::RuleNotIdempotent {
                        key: format!("{class}.{param}"),
                        target: format!("{class}.{new_name}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Target for a fully-qualified `module.Symbol` reference.
    pub fn symbol_target(&self, qualified: &str) -> Option<&str> {
        self.import_map.get(qualified).map(String::as_str)
    }

    /// Target for a whole-module reference.
    pub fn module_target(&self, module: &str) -> Option<&str> {
        self.module_map.get(module).map(String::as_str)
    }

    pub fn param_rule(&self, class: &str, param: &str) -> Option<&ParamRule> {
        self.parameter_rules
            .get(&(class.to_string(), param.to_string()))
    }

    /// Whether any parameter rule exists for `class`. Call sites of classes
    /// outside this set are never touched.
    pub fn has_class(&self, class: &str) -> bool {
        self.known_classes.contains(class)
    }

    pub fn import_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.import_map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn module_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.module_map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn describe(rule: &ParamRule) -> String {
    match rule {
        ParamRule::Remove => "remove".to_string(),
        ParamRule::RenameTo(name) => format!("rename to `{name}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airflow_table_is_consistent() {
        let table = RuleTable::airflow();
        assert!(table.validate().is_ok());
        assert_eq!(
            table.symbol_target("airflow.operators.bash_operator.BashOperator"),
            Some("airflow.operators.bash.BashOperator")
        );
        assert_eq!(
            table.module_target("airflow.contrib.operators.gcs_to_gcs"),
            Some("airflow.providers.google.cloud.transfers.gcs_to_gcs")
        );
        assert_eq!(
            table.param_rule("BashOperator", "provide_context"),
            Some(&ParamRule::Remove)
        );
        assert_eq!(
            table.param_rule("BigQueryOperator", "bql"),
            Some(&ParamRule::RenameTo("sql".to_string()))
        );
        assert!(table.param_rule("BashOperator", "bash_command").is_none());
        assert!(!table.has_class("CustomOperator"));
    }

    #[test]
    fn test_conflicting_import_rule_rejected() {
        let err = RuleTable::from_pairs(
            &[("old.mod.Sym", "new.mod.Sym"), ("old.mod.Sym", "other.mod.Sym")],
            &[],
            &[],
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, MigrateError::RuleConflict { .. }));
    }

    #[test]
    fn test_duplicate_identical_rule_accepted() {
        let table = RuleTable::from_pairs(
            &[("old.mod.Sym", "new.mod.Sym"), ("old.mod.Sym", "new.mod.Sym")],
            &[],
            &[],
            &[],
        )
        .unwrap();
        assert_eq!(table.symbol_target("old.mod.Sym"), Some("new.mod.Sym"));
    }

    #[test]
    fn test_conflicting_param_rule_rejected() {
        let err = RuleTable::from_pairs(
            &[],
            &[],
            &[("Op", "arg")],
            &[("Op", "arg", "renamed")],
        )
        .unwrap_err();
        assert!(matches!(err, MigrateError::RuleConflict { .. }));
    }

    #[test]
    fn test_chained_import_mapping_fails_validation() {
        let table = RuleTable::new()
            .with_import("a.mod.Sym", "b.mod.Sym")
            .with_import("b.mod.Sym", "c.mod.Sym");
        assert!(matches!(
            table.validate(),
            Err(MigrateError::RuleNotIdempotent { .. })
        ));
    }

    #[test]
    fn test_import_target_module_in_module_map_fails_validation() {
        let table = RuleTable::new()
            .with_import("a.mod.Sym", "b.mod.Sym")
            .with_module("b.mod", "c.mod");
        assert!(matches!(
            table.validate(),
            Err(MigrateError::RuleNotIdempotent { .. })
        ));
    }

    #[test]
    fn test_chained_rename_fails_validation() {
        let table = RuleTable::new()
            .with_param("Op", "a", ParamRule::RenameTo("b".to_string()))
            .with_param("Op", "b", ParamRule::Remove);
        assert!(matches!(
            table.validate(),
            Err(MigrateError::RuleNotIdempotent { .. })
        ));
    }
}
