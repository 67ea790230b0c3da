//! 算术工具

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::{parse_args, Tool, ToolFailure};

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum Op {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CalculateInput {
    /// The first number
    num1: f64,
    /// The second number
    num2: f64,
    /// The operation: add, subtract, multiply or divide
    op: Op,
}

/// 两数四则运算
pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Perform basic arithmetic between two numbers."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::to_value(schemars::schema_for!(CalculateInput)).unwrap_or_default()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolFailure> {
        let input: CalculateInput = parse_args(&args)?;
        let result = match input.op {
            Op::Add => input.num1 + input.num2,
            Op::Subtract => input.num1 - input.num2,
            Op::Multiply => input.num1 * input.num2,
            Op::Divide => {
                if input.num2 == 0.0 {
                    return Err(ToolFailure::runtime("division by zero"));
                }
                input.num1 / input.num2
            }
        };
        Ok(json!({"result": result}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn multiplies() {
        let result = CalculateTool
            .invoke(json!({"num1": 123.0, "num2": 456.0, "op": "multiply"}))
            .await
            .unwrap();
        assert_eq!(result["result"], 56088.0);
    }

    #[tokio::test]
    async fn division_by_zero_is_runtime_failure() {
        let err = CalculateTool
            .invoke(json!({"num1": 1.0, "num2": 0.0, "op": "divide"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolFailure::Runtime(_)));
    }

    #[tokio::test]
    async fn unknown_op_is_validation_failure() {
        let err = CalculateTool
            .invoke(json!({"num1": 1.0, "num2": 2.0, "op": "modulo"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolFailure::Validation(_)));
    }
}
