//=============================================
// interpreter/mod.rs
//=============================================
// Goal: BotScript tree-walking interpreter
// Objective: Execute parsed programs against an injected capability port
//            with scoped variables, cooperative stop, and structured errors
//=============================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_recursion::async_recursion;
use tracing::{debug, trace};

use crate::ast::{BinaryOp, Command, Expr, Program, Stmt, UnaryOp};
use crate::runtime::{ExecutionContext, RuntimeError, Value, VariableScope};
use crate::world::{CapabilityPort, TelemetrySnapshot, Vec3};

/// Hard deadline for a single `goto` movement.
pub const GOTO_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum distance at which the agent may dig or place.
pub const MAX_INTERACT_DISTANCE: f64 = 4.5;

/// Upper bound for a single `wait`; longer requests are clamped.
pub const MAX_WAIT_SECONDS: f64 = 300.0;

/// Name of the loop-index variable defined by `repeat` bodies.
const LOOP_INDEX_NAME: &str = "index";

/// Interpreter lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Running,
    Completed,
    Failed,
    Stopped,
}

/// Outcome of one `execute` call. Only the message string of an error is
/// part of the user-visible contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success,
    Stopped,
    Error(String),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success)
    }
}

/// Uniform result of a single agent command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub success: bool,
    pub message: String,
    pub duration_ms: u64,
}

/// Cloneable handle for cooperative cancellation. The flag is observed
/// between statements and at each loop iteration; an in-flight awaited world
/// effect is never interrupted mid-flight.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

//=============================================
//            Interpreter
//=============================================

/// Tree-walking interpreter for BotScript programs.
///
/// All side effects are dispatched through the injected capability port, so
/// the interpreter runs unmodified against a live agent or a test fake.
/// Exactly one script should be active per interpreter/context pair; callers
/// must serialize runs, and `execute` refuses re-entry as a safety net.
pub struct Interpreter {
    port: Arc<dyn CapabilityPort>,
    context: ExecutionContext,
    state: ExecutionState,
    stop: StopHandle,
}

impl Interpreter {
    pub fn new(port: Arc<dyn CapabilityPort>) -> Self {
        Self::with_context(port, ExecutionContext::new())
    }

    pub fn with_context(port: Arc<dyn CapabilityPort>, context: ExecutionContext) -> Self {
        Self {
            port,
            context,
            state: ExecutionState::Idle,
            stop: StopHandle::new(),
        }
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn is_executing(&self) -> bool {
        self.state == ExecutionState::Running
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.context
    }

    /// Swap the backing context. Rejected while a run is in progress; the
    /// rejected context is handed back to the caller.
    pub fn set_context(&mut self, context: ExecutionContext) -> Result<(), ExecutionContext> {
        if self.is_executing() {
            return Err(context);
        }
        self.context = context;
        Ok(())
    }

    /// Handle for stopping the current (or next) run from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Request a cooperative stop of the current run.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Execute a program from the top.
    ///
    /// Refreshes system variables once, then runs top-level statements in
    /// order. The first runtime error or an observed stop flag ends the run;
    /// already-applied side effects are not rolled back.
    pub async fn execute(&mut self, program: &Program) -> ExecutionResult {
        if self.is_executing() {
            return ExecutionResult::Error(
                "a script is already executing on this interpreter".to_string(),
            );
        }

        self.state = ExecutionState::Running;
        self.context.stats_mut().mark_started();

        let snapshot = TelemetrySnapshot::gather(self.port.as_ref());
        self.context.update_system_variables(&snapshot);

        debug!(statements = program.statements.len(), "script run started");

        let mut outcome = ExecutionResult::Success;
        for statement in &program.statements {
            if self.stop.is_stopped() {
                outcome = ExecutionResult::Stopped;
                break;
            }
            if let Err(error) = self.exec_statement(statement).await {
                let message = error.to_string();
                self.context.stats_mut().record_error(message.clone());
                outcome = ExecutionResult::Error(message);
                break;
            }
        }

        // A stop raised inside a block surfaces here as well.
        if matches!(outcome, ExecutionResult::Success) && self.stop.is_stopped() {
            outcome = ExecutionResult::Stopped;
        }

        self.context.stats_mut().mark_finished();
        self.state = match &outcome {
            ExecutionResult::Success => ExecutionState::Completed,
            ExecutionResult::Stopped => ExecutionState::Stopped,
            ExecutionResult::Error(_) => ExecutionState::Failed,
        };
        self.stop.clear();

        debug!(state = ?self.state, "script run finished");
        outcome
    }

    //=============================================
    //            Statement Execution
    //=============================================

    #[async_recursion]
    async fn exec_statement(&mut self, statement: &Stmt) -> Result<(), RuntimeError> {
        self.context.stats_mut().statements_executed += 1;
        trace!(position = ?statement.position(), "executing statement");

        match statement {
            Stmt::VarDecl {
                name,
                initializer,
                position,
            } => {
                let value = self.eval_expression(initializer)?;
                self.context.define_variable(
                    name.clone(),
                    value,
                    VariableScope::Local,
                    false,
                    position.line,
                    position.column,
                )
            }
            Stmt::Assignment { target, value, .. } => {
                let value = self.eval_expression(value)?;
                self.context.set_variable(target, value)
            }
            Stmt::If {
                condition,
                then_block,
                else_block,
                ..
            } => {
                let branch = if self.eval_expression(condition)?.is_truthy() {
                    Some(then_block)
                } else {
                    else_block.as_ref()
                };
                if let Some(block) = branch {
                    self.context.enter_scope();
                    let result = self.exec_block(block).await;
                    self.context.exit_scope();
                    result?;
                }
                Ok(())
            }
            Stmt::Repeat { count, body, .. } => {
                let iterations = match self.eval_expression(count)? {
                    Value::Number(n) => n.floor(),
                    other => {
                        return Err(RuntimeError::InvalidCommandArgument(format!(
                            "repeat count must be a number, got {}",
                            other.type_name()
                        )));
                    }
                };
                if !iterations.is_finite() {
                    return Err(RuntimeError::InvalidCommandArgument(
                        "repeat count must be finite".to_string(),
                    ));
                }
                if iterations < 0.0 {
                    return Err(RuntimeError::InvalidCommandArgument(
                        "repeat count must not be negative".to_string(),
                    ));
                }

                for index in 0..iterations as u64 {
                    if self.stop.is_stopped() {
                        break;
                    }
                    self.context.enter_scope();
                    let result = match self.context.define_variable(
                        LOOP_INDEX_NAME,
                        Value::Number(index as f64),
                        VariableScope::Local,
                        false,
                        0,
                        0,
                    ) {
                        Ok(()) => self.exec_block(body).await,
                        Err(error) => Err(error),
                    };
                    self.context.exit_scope();
                    result?;
                }
                Ok(())
            }
            Stmt::Command(command) => {
                let outcome = self.exec_command(command).await?;
                self.context.stats_mut().commands_executed += 1;
                debug!(
                    command = command.name(),
                    duration_ms = outcome.duration_ms,
                    "command complete"
                );
                Ok(())
            }
            Stmt::Expression(expr) => {
                self.eval_expression(expr)?;
                Ok(())
            }
        }
    }

    #[async_recursion]
    async fn exec_block(&mut self, block: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in block {
            if self.stop.is_stopped() {
                break;
            }
            self.exec_statement(statement).await?;
        }
        Ok(())
    }

    //=============================================
    //            Expression Evaluation
    //=============================================

    fn eval_expression(&self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number { value, .. } => Ok(Value::Number(*value)),
            Expr::String { value, .. } => Ok(Value::String(value.clone())),
            Expr::Boolean { value, .. } => Ok(Value::Boolean(*value)),
            Expr::Variable { name, .. } => self.context.get_variable(name),
            Expr::Binary {
                left, op, right, ..
            } => {
                // Both operands evaluate eagerly; `and`/`or` do not
                // short-circuit in BotScript.
                let left = self.eval_expression(left)?;
                let right = self.eval_expression(right)?;
                Self::apply_binary(*op, left, right)
            }
            Expr::Unary { op, operand, .. } => {
                let value = self.eval_expression(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
                    UnaryOp::Negate => match value.as_number() {
                        Some(n) => Ok(Value::Number(-n)),
                        None => Err(RuntimeError::TypeMismatch(format!(
                            "unary '{}' requires a number, got {}",
                            op,
                            value.type_name()
                        ))),
                    },
                }
            }
        }
    }

    fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
        match op {
            // Numeric addition when both sides are numbers, otherwise string
            // concatenation via stringification of both sides.
            BinaryOp::Add => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                _ => Ok(Value::String(format!("{}{}", left, right))),
            },
            BinaryOp::Subtract
            | BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Less
            | BinaryOp::Greater
            | BinaryOp::LessEqual
            | BinaryOp::GreaterEqual => {
                let (a, b) = match (&left, &right) {
                    (Value::Number(a), Value::Number(b)) => (*a, *b),
                    _ => {
                        return Err(RuntimeError::TypeMismatch(format!(
                            "operator '{}' requires number operands, got {} and {}",
                            op,
                            left.type_name(),
                            right.type_name()
                        )));
                    }
                };
                match op {
                    BinaryOp::Subtract => Ok(Value::Number(a - b)),
                    BinaryOp::Multiply => Ok(Value::Number(a * b)),
                    BinaryOp::Divide => {
                        if b == 0.0 {
                            Err(RuntimeError::DivisionByZero)
                        } else {
                            Ok(Value::Number(a / b))
                        }
                    }
                    BinaryOp::Less => Ok(Value::Boolean(a < b)),
                    BinaryOp::Greater => Ok(Value::Boolean(a > b)),
                    BinaryOp::LessEqual => Ok(Value::Boolean(a <= b)),
                    BinaryOp::GreaterEqual => Ok(Value::Boolean(a >= b)),
                    _ => unreachable!("numeric operator arm"),
                }
            }
            // Equality compares kind and value across the whole union.
            BinaryOp::Equal => Ok(Value::Boolean(left == right)),
            BinaryOp::NotEqual => Ok(Value::Boolean(left != right)),
            BinaryOp::And => Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
            BinaryOp::Or => Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),
        }
    }

    //=============================================
    //            Command Execution
    //=============================================

    async fn exec_command(&mut self, command: &Command) -> Result<CommandOutcome, RuntimeError> {
        let started = Instant::now();

        let message = match command {
            Command::Say { message, .. } => {
                let text = self.eval_expression(message)?.to_string();
                self.port.send_message(&text);
                format!("said \"{}\"", text)
            }
            Command::Goto { x, y, z, .. } => {
                let x = self.expect_number(x, "goto coordinate")?;
                let y = self.expect_number(y, "goto coordinate")?;
                let z = self.expect_number(z, "goto coordinate")?;

                match tokio::time::timeout(GOTO_TIMEOUT, self.port.goto(x, y, z)).await {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(RuntimeError::CommandFailure(format!(
                            "goto ({}, {}, {}) timed out after {}s",
                            x,
                            y,
                            z,
                            GOTO_TIMEOUT.as_secs()
                        )));
                    }
                }
                format!("arrived at ({}, {}, {})", x, y, z)
            }
            Command::Attack { target, .. } => {
                let name = self.eval_expression(target)?.to_string();
                let entity = self.port.find_nearest_entity(&name).ok_or_else(|| {
                    RuntimeError::CommandFailure(format!("no entity named '{}' nearby", name))
                })?;
                self.port.attack(&entity).await?;
                format!("attacked '{}'", entity.name)
            }
            Command::Dig { block, .. } => {
                let query = match block {
                    Some(expr) => Some(self.eval_expression(expr)?.to_string()),
                    None => None,
                };
                let block = self
                    .port
                    .find_nearest_block(query.as_deref())
                    .ok_or_else(|| {
                        RuntimeError::CommandFailure(match &query {
                            Some(name) => format!("no '{}' block found nearby", name),
                            None => "no block to dig".to_string(),
                        })
                    })?;

                let distance = self.port.get_position().distance_to(block.position);
                if distance > MAX_INTERACT_DISTANCE {
                    return Err(RuntimeError::CommandFailure(format!(
                        "block '{}' is {:.1} blocks away (max {})",
                        block.name, distance, MAX_INTERACT_DISTANCE
                    )));
                }
                if block.is_air {
                    return Err(RuntimeError::CommandFailure("cannot dig air".to_string()));
                }
                if block.is_liquid {
                    return Err(RuntimeError::CommandFailure(format!(
                        "cannot dig liquid '{}'",
                        block.name
                    )));
                }

                if let Some(tool) = self.port.find_best_tool(&block) {
                    self.port.equip(&tool).await?;
                }
                self.port.dig(&block).await?;
                format!("dug '{}'", block.name)
            }
            Command::Place { item, coords, .. } => {
                let item_name = self.eval_expression(item)?.to_string();
                let item = self.port.find_item(&item_name).ok_or_else(|| {
                    RuntimeError::CommandFailure(format!("no '{}' in inventory", item_name))
                })?;

                let target = match coords {
                    Some((x, y, z)) => {
                        let target = Vec3::new(
                            self.expect_number(x, "place coordinate")?,
                            self.expect_number(y, "place coordinate")?,
                            self.expect_number(z, "place coordinate")?,
                        );
                        let distance = self.port.get_position().distance_to(target);
                        if distance > MAX_INTERACT_DISTANCE {
                            return Err(RuntimeError::CommandFailure(format!(
                                "placement target is {:.1} blocks away (max {})",
                                distance, MAX_INTERACT_DISTANCE
                            )));
                        }
                        target
                    }
                    // No coordinates: place adjacent to the agent.
                    None => self.port.get_position(),
                };

                self.port.place_block(&item, target).await?;
                format!(
                    "placed '{}' at ({}, {}, {})",
                    item.name, target.x, target.y, target.z
                )
            }
            Command::Equip { item, .. } => {
                let item_name = self.eval_expression(item)?.to_string();
                let item = self.port.find_item(&item_name).ok_or_else(|| {
                    RuntimeError::CommandFailure(format!("no '{}' in inventory", item_name))
                })?;
                self.port.equip(&item).await?;
                format!("equipped '{}'", item.name)
            }
            Command::Drop { item, count, .. } => {
                let item_name = self.eval_expression(item)?.to_string();
                let item = self.port.find_item(&item_name).ok_or_else(|| {
                    RuntimeError::CommandFailure(format!("no '{}' in inventory", item_name))
                })?;

                let count = match count {
                    Some(expr) => {
                        let requested = match self.eval_expression(expr)? {
                            Value::Number(n) => n.floor(),
                            other => {
                                return Err(RuntimeError::InvalidCommandArgument(format!(
                                    "drop count must be a number, got {}",
                                    other.type_name()
                                )));
                            }
                        };
                        if requested <= 0.0 {
                            return Err(RuntimeError::InvalidCommandArgument(
                                "drop count must be positive".to_string(),
                            ));
                        }
                        requested as u32
                    }
                    // No count drops the whole stack.
                    None => item.count,
                };

                self.port.toss(&item, count).await?;
                format!("dropped {} x '{}'", count, item.name)
            }
            Command::Wait { seconds, .. } => {
                let requested = match self.eval_expression(seconds)? {
                    Value::Number(n) => n,
                    other => {
                        return Err(RuntimeError::InvalidCommandArgument(format!(
                            "wait duration must be a number, got {}",
                            other.type_name()
                        )));
                    }
                };
                if requested < 0.0 {
                    return Err(RuntimeError::InvalidCommandArgument(
                        "wait duration must not be negative".to_string(),
                    ));
                }
                let clamped = requested.min(MAX_WAIT_SECONDS);
                tokio::time::sleep(Duration::from_secs_f64(clamped)).await;
                format!("waited {}s", clamped)
            }
        };

        Ok(CommandOutcome {
            success: true,
            message,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn expect_number(&self, expr: &Expr, what: &str) -> Result<f64, RuntimeError> {
        let value = self.eval_expression(expr)?;
        value.as_number().ok_or_else(|| {
            RuntimeError::InvalidCommandArgument(format!(
                "{} must be a number, got {}",
                what,
                value.type_name()
            ))
        })
    }
}

//=============================================
// End of file
//=============================================
