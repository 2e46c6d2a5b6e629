#![allow(clippy::result_large_err)]

use crate::core::coerce::{self, as_number, number_value};
use crate::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crate::core::error::AppError;
use crate::core::helper::{ExecutionContext, Helper};
use crate::core::helpers::{read_optional, write_field, FailWith};
use crate::core::schema::{ConfigSchema, PropertySchema};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde_json::{json, Map, Value};

const OPERATIONS: [&str; 11] = [
    "add", "subtract", "multiply", "divide", "power", "sqrt", "abs", "round", "ceil", "floor",
    "percent",
];
const MAX_DECIMALS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Sqrt,
    Abs,
    Round,
    Ceil,
    Floor,
    Percent,
}

impl Operation {
    fn parse(raw: &str) -> Option<Self> {
        let op = match raw {
            "add" => Operation::Add,
            "subtract" => Operation::Subtract,
            "multiply" => Operation::Multiply,
            "divide" => Operation::Divide,
            "power" => Operation::Power,
            "sqrt" => Operation::Sqrt,
            "abs" => Operation::Abs,
            "round" => Operation::Round,
            "ceil" => Operation::Ceil,
            "floor" => Operation::Floor,
            "percent" => Operation::Percent,
            _ => return None,
        };
        Some(op)
    }

    fn is_binary(self) -> bool {
        matches!(
            self,
            Operation::Add
                | Operation::Subtract
                | Operation::Multiply
                | Operation::Divide
                | Operation::Power
                | Operation::Percent
        )
    }

    fn label(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
            Operation::Sqrt => "sqrt",
            Operation::Abs => "abs",
            Operation::Round => "round",
            Operation::Ceil => "ceil",
            Operation::Floor => "floor",
            Operation::Percent => "percent",
        }
    }
}

enum SecondOperand {
    None,
    Literal(f64),
    Field(String),
}

struct MathConfig {
    operation: Operation,
    source_field: String,
    target_field: String,
    second: SecondOperand,
    decimals: i32,
}

impl MathConfig {
    fn from_config(config: &Map<String, Value>) -> Result<Self, AppError> {
        let raw_op = coerce::require_str(config, "operation")?;
        let operation = Operation::parse(&raw_op).ok_or_else(|| {
            AppError::invalid_field(
                "operation",
                format!("operation must be one of: {}; got '{}'", OPERATIONS.join(", "), raw_op),
            )
        })?;
        let source_field = coerce::require_str(config, "source_field")?;
        let target_field =
            coerce::config_str(config, "target_field").unwrap_or_else(|| source_field.clone());
        let second = match (
            coerce::config_str(config, "second_field"),
            coerce::config_f64(config, "operand")?,
        ) {
            (Some(field), _) => SecondOperand::Field(field),
            (None, Some(value)) => SecondOperand::Literal(value),
            (None, None) => SecondOperand::None,
        };
        if operation.is_binary() && matches!(second, SecondOperand::None) {
            return Err(AppError::invalid_field(
                "operand",
                format!(
                    "operand or second_field is required when operation is {}",
                    operation.label()
                ),
            ));
        }
        // One-value operations never read or report a second operand.
        let second = if operation.is_binary() {
            second
        } else {
            SecondOperand::None
        };
        let decimals = coerce::config_i64(config, "decimals")?.unwrap_or(2);
        if !(0..=MAX_DECIMALS).contains(&decimals) {
            return Err(AppError::invalid_field(
                "decimals",
                format!("decimals must be between 0 and {}, got {}", MAX_DECIMALS, decimals),
            ));
        }
        Ok(Self {
            operation,
            source_field,
            target_field,
            second,
            decimals: decimals as i32,
        })
    }
}

fn computation_error(message: String) -> AppError {
    AppError::new(ErrorCategory::ComputationError, message).with_code("HLP-MATH-001")
}

fn compute(op: Operation, x: f64, y: Option<f64>, decimals: i32) -> Result<f64, AppError> {
    let y = y.unwrap_or(0.0);
    let result = match op {
        Operation::Add => x + y,
        Operation::Subtract => x - y,
        Operation::Multiply => x * y,
        Operation::Divide => {
            if y == 0.0 {
                return Err(computation_error(format!("Cannot divide {} by zero", x)));
            }
            x / y
        }
        Operation::Power => x.powf(y),
        Operation::Sqrt => {
            if x < 0.0 {
                return Err(computation_error(format!(
                    "Cannot take square root of negative number {}",
                    x
                )));
            }
            x.sqrt()
        }
        Operation::Abs => x.abs(),
        Operation::Round => {
            let factor = 10f64.powi(decimals);
            (x * factor).round() / factor
        }
        Operation::Ceil => x.ceil(),
        Operation::Floor => x.floor(),
        Operation::Percent => x * y / 100.0,
    };
    if !result.is_finite() {
        return Err(computation_error(format!(
            "{} of {} and {} does not produce a finite number",
            op.label(),
            x,
            y
        )));
    }
    Ok(result)
}

/// Arithmetic on a numeric contact field.
#[derive(Default)]
pub struct MathIt;

impl MathIt {
    pub fn new() -> Self {
        Self
    }

    async fn read_number(
        input: &HelperInput<'_>,
        field: &str,
        role: &str,
    ) -> Result<f64, AppError> {
        let value = read_optional(input, field).await?.ok_or_else(|| {
            let mut err = AppError::new(
                ErrorCategory::ReadError,
                format!("{} field '{}' is empty or missing", role, field),
            )
            .with_code("HLP-READ-002");
            err.add_context("field", field);
            err
        })?;
        as_number(&value).ok_or_else(|| {
            computation_error(format!(
                "{} field '{}' is not a number: {}",
                role, field, value
            ))
        })
    }
}

#[async_trait]
impl Helper for MathIt {
    fn name(&self) -> &'static str {
        "Math It"
    }

    fn helper_type(&self) -> &'static str {
        "math_it"
    }

    fn category(&self) -> &'static str {
        "data"
    }

    fn description(&self) -> &'static str {
        "Perform arithmetic on a numeric field and save the result"
    }

    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property(
                "operation",
                PropertySchema::string("Math operation to perform").with_enum(&OPERATIONS),
            )
            .property(
                "source_field",
                PropertySchema::string("Field holding the first operand"),
            )
            .property(
                "target_field",
                PropertySchema::string("Field receiving the result (defaults to source_field)"),
            )
            .property(
                "operand",
                PropertySchema::number("Literal second operand for binary operations"),
            )
            .property(
                "second_field",
                PropertySchema::string("Field holding the second operand; wins over operand"),
            )
            .property(
                "decimals",
                PropertySchema::integer("Decimal places kept by round").with_default(json!(2)),
            )
            .required(&["operation", "source_field"])
    }

    fn validate_config(&self, config: &Map<String, Value>) -> Result<(), AppError> {
        self.config_schema().validate(config)?;
        MathConfig::from_config(config).map(|_| ())
    }

    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        let config = MathConfig::from_config(&input.config)?;
        let mut output = HelperOutput::new();

        let x = Self::read_number(&input, &config.source_field, "Source")
            .await
            .fail_with(&mut output)?;
        output.log(format!("read {} from '{}'", x, config.source_field));

        let y = match &config.second {
            SecondOperand::None => None,
            SecondOperand::Literal(value) => Some(*value),
            SecondOperand::Field(field) => {
                let value = Self::read_number(&input, field, "Second")
                    .await
                    .fail_with(&mut output)?;
                output.log(format!("read {} from '{}'", value, field));
                Some(value)
            }
        };

        let result = compute(config.operation, x, y, config.decimals).fail_with(&mut output)?;
        let value = number_value(result).fail_with(&mut output)?;
        write_field(&input, &mut output, &config.target_field, value)
            .await
            .fail_with(&mut output)?;

        let expression = match y {
            Some(y) => format!("{}({}, {})", config.operation.label(), x, y),
            None => format!("{}({})", config.operation.label(), x),
        };
        Ok(output.succeed(format!(
            "Calculated {} = {} and saved to {}",
            expression, result, config.target_field
        )))
    }
}
