//! Order payload as accepted from the storefront.
//!
//! Only the shape needed to route the request is enforced (a non-empty
//! `items` array). Item fields are kept as raw JSON so the message shows
//! exactly what was submitted.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    #[error("Items required")]
    ItemsRequired,
}

/// One submitted line item. `None` means the key was absent, which renders
/// differently from an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderItem {
    pub title: Option<Value>,
    pub qty: Option<Value>,
    pub price: Option<Value>,
}

impl OrderItem {
    /// Non-object entries have no fields.
    fn from_json(value: &Value) -> Self {
        Self {
            title: value.get("title").cloned(),
            qty: value.get("qty").cloned(),
            price: value.get("price").cloned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    /// Expected to equal the sum of `qty * price`; never checked.
    pub total: Option<Value>,
    pub created_at: Option<Value>,
    pub phone: Option<String>,
}

impl OrderRequest {
    pub fn from_json(body: &Value) -> Result<Self, OrderValidationError> {
        let items = match body.get("items") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(OrderValidationError::ItemsRequired),
        };

        Ok(Self {
            items: items.iter().map(OrderItem::from_json).collect(),
            total: body.get("total").cloned(),
            created_at: body.get("created_at").cloned(),
            phone: body
                .get("phone")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

/// Body returned once the chat message was accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendOrderResponse {
    pub ok: bool,
    pub result: Value,
}

impl SendOrderResponse {
    pub fn delivered(result: Value) -> Self {
        Self { ok: true, result }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_missing_non_array_and_empty_items() {
        for body in [
            json!({}),
            json!({ "items": null }),
            json!({ "items": "pizza" }),
            json!({ "items": { "title": "Pizza" } }),
            json!({ "items": [] }),
            json!([{ "title": "Pizza" }]),
            json!(null),
        ] {
            assert_eq!(
                OrderRequest::from_json(&body),
                Err(OrderValidationError::ItemsRequired),
                "body: {body}"
            );
        }
    }

    #[test]
    fn keeps_items_in_submitted_order() {
        let order = OrderRequest::from_json(&json!({
            "items": [
                { "title": "Pizza", "qty": 2, "price": 50000 },
                { "title": "Cola", "qty": 1, "price": 8000 }
            ],
            "total": 108000,
            "phone": "+998901234567"
        }))
        .unwrap();

        let titles: Vec<_> = order.items.iter().map(|i| i.title.clone()).collect();
        assert_eq!(titles, vec![Some(json!("Pizza")), Some(json!("Cola"))]);
        assert_eq!(order.total, Some(json!(108000)));
        assert_eq!(order.phone.as_deref(), Some("+998901234567"));
        assert_eq!(order.created_at, None);
    }

    #[test]
    fn distinguishes_missing_fields_from_null() {
        let order = OrderRequest::from_json(&json!({
            "items": [{ "title": null }, 5]
        }))
        .unwrap();

        assert_eq!(order.items[0].title, Some(Value::Null));
        assert_eq!(order.items[0].qty, None);
        assert_eq!(order.items[1], OrderItem::default());
    }
}
