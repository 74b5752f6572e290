//=============================================
// runtime/context.rs
//=============================================
// Goal: BotScript scoped variable storage and execution statistics
// Objective: Provide the global/local scope chain, readonly enforcement,
//            and the live system-variable mirror synced from agent telemetry
//=============================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::error::RuntimeError;
use super::value::Value;
use crate::world::TelemetrySnapshot;

const DEFAULT_BOT_NAME: &str = "bot";

/// Where a variable binding lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    Global,
    Local,
}

/// A variable binding with its definition site.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub value: Value,
    pub scope: VariableScope,
    pub readonly: bool,
    pub line: usize,
    pub column: usize,
}

/// Counters and error log for one or more script runs. Mutated only by the
/// interpreter while running; cleared only by an explicit context reset.
#[derive(Debug, Clone)]
pub struct ExecutionStats {
    pub statements_executed: u64,
    pub commands_executed: u64,
    pub variables_created: u64,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    errors: Vec<String>,
}

impl ExecutionStats {
    fn new() -> Self {
        Self {
            statements_executed: 0,
            commands_executed: 0,
            variables_created: 0,
            started_at: Utc::now(),
            finished_at: None,
            errors: Vec::new(),
        }
    }

    pub fn mark_started(&mut self) {
        self.started_at = Utc::now();
        self.finished_at = None;
    }

    pub fn mark_finished(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Wall-clock duration of the last run, once finished.
    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

type Frame = HashMap<String, VariableInfo>;

/// Scoped variable store: one persistent global frame plus an ordered stack
/// of local frames. Name resolution walks the local stack innermost-first,
/// then falls back to the global frame, so an inner binding shadows an outer
/// one without touching it.
pub struct ExecutionContext {
    globals: Frame,
    locals: Vec<Frame>,
    stats: ExecutionStats,
    bot_name: String,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::with_bot_name(DEFAULT_BOT_NAME)
    }

    pub fn with_bot_name(bot_name: impl Into<String>) -> Self {
        let mut context = Self {
            globals: HashMap::new(),
            locals: Vec::new(),
            stats: ExecutionStats::new(),
            bot_name: bot_name.into(),
        };
        context.seed_builtins();
        context
    }

    /// Define a variable in the requested scope.
    ///
    /// Quirk kept from the original language: defining a Local variable while
    /// no local frame is open silently becomes a Global definition.
    pub fn define_variable(
        &mut self,
        name: impl Into<String>,
        value: Value,
        scope: VariableScope,
        readonly: bool,
        line: usize,
        column: usize,
    ) -> Result<(), RuntimeError> {
        let name = name.into();
        let effective_scope = match scope {
            VariableScope::Local if !self.locals.is_empty() => VariableScope::Local,
            _ => VariableScope::Global,
        };

        let frame = match effective_scope {
            VariableScope::Local => self.locals.last_mut().expect("local frame present"),
            VariableScope::Global => &mut self.globals,
        };

        if let Some(existing) = frame.get(&name) {
            if existing.readonly {
                return Err(RuntimeError::ReadonlyViolation(name));
            }
        }

        frame.insert(
            name.clone(),
            VariableInfo {
                name,
                value,
                scope: effective_scope,
                readonly,
                line,
                column,
            },
        );
        self.stats.variables_created += 1;
        Ok(())
    }

    /// Resolve a name through the full scope chain.
    pub fn get_variable(&self, name: &str) -> Result<Value, RuntimeError> {
        for frame in self.locals.iter().rev() {
            if let Some(info) = frame.get(name) {
                return Ok(info.value.clone());
            }
        }
        match self.globals.get(name) {
            Some(info) => Ok(info.value.clone()),
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    /// Assign to an existing binding, innermost match first.
    pub fn set_variable(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        for frame in self.locals.iter_mut().rev() {
            if let Some(info) = frame.get_mut(name) {
                if info.readonly {
                    return Err(RuntimeError::ReadonlyViolation(name.to_string()));
                }
                info.value = value;
                return Ok(());
            }
        }
        match self.globals.get_mut(name) {
            Some(info) => {
                if info.readonly {
                    return Err(RuntimeError::ReadonlyViolation(name.to_string()));
                }
                info.value = value;
                Ok(())
            }
            None => Err(RuntimeError::UndefinedVariable(name.to_string())),
        }
    }

    pub fn enter_scope(&mut self) {
        self.locals.push(HashMap::new());
    }

    /// Exiting with no open local frame is a no-op, not an error.
    pub fn exit_scope(&mut self) {
        self.locals.pop();
    }

    pub fn scope_depth(&self) -> usize {
        self.locals.len()
    }

    /// Overwrite the reserved readonly telemetry variables from a snapshot.
    /// Called once at the start of every script run; `timestamp` is always
    /// refreshed as well.
    pub fn update_system_variables(&mut self, snapshot: &TelemetrySnapshot) {
        self.define_system("bot_health", Value::Number(snapshot.health));
        self.define_system("bot_food", Value::Number(snapshot.food));
        self.define_system("bot_x", Value::Number(snapshot.position.x));
        self.define_system("bot_y", Value::Number(snapshot.position.y));
        self.define_system("bot_z", Value::Number(snapshot.position.z));
        self.define_system("bot_health_low", Value::Boolean(snapshot.health_low));
        self.define_system("bot_hunger_low", Value::Boolean(snapshot.hunger_low));
        self.define_system("bot_needs_food", Value::Boolean(snapshot.needs_food));
        self.define_system(
            "bot_inventory_used",
            Value::Number(f64::from(snapshot.inventory_used)),
        );
        self.define_system(
            "bot_inventory_free",
            Value::Number(f64::from(snapshot.inventory_free)),
        );
        self.define_system("bot_inventory_full", Value::Boolean(snapshot.inventory_full));
        self.define_system("light_level", Value::Number(snapshot.light_level));
        self.define_system("time_of_day", Value::Number(snapshot.time_of_day));
        self.refresh_timestamp();
    }

    /// Clear all user and system state and re-seed the built-ins.
    pub fn reset(&mut self) {
        self.globals.clear();
        self.locals.clear();
        self.stats = ExecutionStats::new();
        self.seed_builtins();
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut ExecutionStats {
        &mut self.stats
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// All currently visible bindings, globals first, for host inspection.
    pub fn variables(&self) -> impl Iterator<Item = &VariableInfo> {
        self.globals
            .values()
            .chain(self.locals.iter().flat_map(|frame| frame.values()))
    }

    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables().map(|info| info.name.clone()).collect();
        names.sort();
        // A shadowed name is still one visible binding.
        names.dedup();
        names
    }

    fn seed_builtins(&mut self) {
        self.define_system("bot_name", Value::String(self.bot_name.clone()));
        self.define_system(
            "version",
            Value::String(env!("CARGO_PKG_VERSION").to_string()),
        );
        self.define_system("pi", Value::Number(std::f64::consts::PI));
        self.refresh_timestamp();
    }

    fn refresh_timestamp(&mut self) {
        self.define_system("timestamp", Value::Number(Utc::now().timestamp() as f64));
    }

    /// Upsert a reserved readonly global. Bypasses the readonly check; user
    /// statements can never reach this path.
    fn define_system(&mut self, name: &str, value: Value) {
        self.globals.insert(
            name.to_string(),
            VariableInfo {
                name: name.to_string(),
                value,
                scope: VariableScope::Global,
                readonly: true,
                line: 0,
                column: 0,
            },
        );
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn define_user(
        context: &mut ExecutionContext,
        name: &str,
        value: Value,
        scope: VariableScope,
    ) {
        context
            .define_variable(name, value, scope, false, 1, 1)
            .expect("define");
    }

    #[test]
    fn test_builtins_seeded() {
        let context = ExecutionContext::with_bot_name("scout");
        assert_eq!(
            context.get_variable("bot_name").expect("bot_name"),
            Value::String("scout".to_string())
        );
        assert_eq!(
            context.get_variable("pi").expect("pi"),
            Value::Number(std::f64::consts::PI)
        );
        assert!(context.get_variable("version").is_ok());
        assert!(context.get_variable("timestamp").is_ok());
    }

    #[test]
    fn test_local_definition_without_frame_becomes_global() {
        let mut context = ExecutionContext::new();
        define_user(&mut context, "x", Value::Number(1.0), VariableScope::Local);
        // No local frame was open, so the binding landed in globals and
        // survives scope churn.
        context.enter_scope();
        context.exit_scope();
        assert_eq!(context.get_variable("x").expect("x"), Value::Number(1.0));
    }

    #[test]
    fn test_shadow_then_restore() {
        let mut context = ExecutionContext::new();
        define_user(&mut context, "x", Value::Number(1.0), VariableScope::Global);

        context.enter_scope();
        define_user(&mut context, "x", Value::Number(2.0), VariableScope::Local);
        assert_eq!(context.get_variable("x").expect("x"), Value::Number(2.0));
        context.exit_scope();

        assert_eq!(context.get_variable("x").expect("x"), Value::Number(1.0));
    }

    #[test]
    fn test_inner_scope_binding_gone_after_exit() {
        let mut context = ExecutionContext::new();
        context.enter_scope();
        define_user(&mut context, "tmp", Value::Boolean(true), VariableScope::Local);
        context.exit_scope();
        assert_eq!(
            context.get_variable("tmp"),
            Err(RuntimeError::UndefinedVariable("tmp".to_string()))
        );
    }

    #[test]
    fn test_assignment_targets_innermost_binding() {
        let mut context = ExecutionContext::new();
        define_user(&mut context, "x", Value::Number(1.0), VariableScope::Global);
        context.enter_scope();
        define_user(&mut context, "x", Value::Number(2.0), VariableScope::Local);

        context.set_variable("x", Value::Number(9.0)).expect("set");
        assert_eq!(context.get_variable("x").expect("x"), Value::Number(9.0));
        context.exit_scope();
        assert_eq!(context.get_variable("x").expect("x"), Value::Number(1.0));
    }

    #[test]
    fn test_readonly_rejects_assignment_and_redefinition() {
        let mut context = ExecutionContext::new();
        assert_eq!(
            context.set_variable("pi", Value::Number(3.0)),
            Err(RuntimeError::ReadonlyViolation("pi".to_string()))
        );
        assert_eq!(
            context.define_variable("pi", Value::Number(3.0), VariableScope::Global, false, 1, 1),
            Err(RuntimeError::ReadonlyViolation("pi".to_string()))
        );
    }

    #[test]
    fn test_undefined_variable_error_names_the_variable() {
        let context = ExecutionContext::new();
        let err = context.get_variable("missing").expect_err("undefined");
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_exit_scope_with_empty_stack_is_noop() {
        let mut context = ExecutionContext::new();
        context.exit_scope();
        context.exit_scope();
        assert_eq!(context.scope_depth(), 0);
    }

    #[test]
    fn test_system_variables_refresh_but_stay_readonly() {
        let mut context = ExecutionContext::new();
        let mut snapshot = TelemetrySnapshot::default();
        snapshot.health = 20.0;
        context.update_system_variables(&snapshot);
        assert_eq!(
            context.get_variable("bot_health").expect("bot_health"),
            Value::Number(20.0)
        );

        snapshot.health = 7.5;
        context.update_system_variables(&snapshot);
        assert_eq!(
            context.get_variable("bot_health").expect("bot_health"),
            Value::Number(7.5)
        );
        assert!(matches!(
            context.set_variable("bot_health", Value::Number(0.0)),
            Err(RuntimeError::ReadonlyViolation(_))
        ));
    }

    #[test]
    fn test_variable_names_lists_all_visible_bindings() {
        let mut context = ExecutionContext::new();
        define_user(&mut context, "a", Value::Number(1.0), VariableScope::Global);
        context.enter_scope();
        define_user(&mut context, "b", Value::Number(2.0), VariableScope::Local);

        let names = context.variable_names();
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
        assert!(names.contains(&"pi".to_string()));
    }

    #[test]
    fn test_variable_names_list_shadowed_name_once() {
        let mut context = ExecutionContext::new();
        define_user(&mut context, "x", Value::Number(1.0), VariableScope::Global);
        context.enter_scope();
        define_user(&mut context, "x", Value::Number(2.0), VariableScope::Local);

        let names = context.variable_names();
        assert_eq!(names.iter().filter(|name| *name == "x").count(), 1);
    }

    #[test]
    fn test_reset_clears_user_state_and_reseeds() {
        let mut context = ExecutionContext::new();
        define_user(&mut context, "x", Value::Number(1.0), VariableScope::Global);
        context.stats_mut().record_error("boom");
        context.reset();

        assert!(context.get_variable("x").is_err());
        assert_eq!(context.stats().error_count(), 0);
        assert!(context.get_variable("pi").is_ok());
        assert!(context.get_variable("bot_name").is_ok());
    }
}

//=============================================
// End of file
//=============================================
