use wasm_bindgen::prelude::*;

use crate::plan::{self, Plan};

fn error_json(e: impl std::fmt::Display) -> String {
    serde_json::json!({ "error": e.to_string() }).to_string()
}

fn compile(json: &str) -> Result<(Plan, crate::actions::ActionList), String> {
    let plan = Plan::from_json(json).map_err(error_json)?;
    let list = plan.compile().map_err(error_json)?;
    Ok((plan, list))
}

/// Aggregated balance changes of a plan, one entry per asset and location.
#[wasm_bindgen]
pub fn aggregate_plan_json(json: &str) -> String {
    let (_, list) = match compile(json) {
        Ok(compiled) => compiled,
        Err(e) => return e,
    };
    serde_json::json!({
        "balances": plan::balance_report(&list),
        "pull_requirements": list.pull_requirements()
            .iter()
            .map(|(token, amount)| serde_json::json!({
                "token": token.to_string(),
                "amount": amount.to_string(),
            }))
            .collect::<Vec<_>>(),
        "can_execute": list.can_execute(),
    })
    .to_string()
}

/// Executor arguments for a plan, ready to hand to a browser wallet.
/// `null` when the plan has no `position_id`.
#[wasm_bindgen]
pub fn assemble_plan_json(json: &str) -> String {
    let (plan, list) = match compile(json) {
        Ok(compiled) => compiled,
        Err(e) => return e,
    };
    match plan.submission(&list) {
        Ok(report) => serde_json::to_string(&report).unwrap_or_else(error_json),
        Err(e) => error_json(e),
    }
}

#[wasm_bindgen]
pub fn get_schema() -> String {
    plan::schema_json().unwrap_or_else(error_json)
}

/// Structured variant of [`aggregate_plan_json`] for callers that want a JS object.
#[wasm_bindgen]
pub fn plan_balances(json: &str) -> Result<JsValue, JsValue> {
    let (_, list) = compile(json).map_err(|e| JsValue::from_str(&e))?;
    serde_wasm_bindgen::to_value(&plan::balance_report(&list)).map_err(JsValue::from)
}
