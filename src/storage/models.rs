//! Stored row types, serialized verbatim as wire objects.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Row, ToSql};
use serde::{Deserialize, Serialize};

/// One shopping excursion against a store. Checkout fields stay null
/// until the trip is checked out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    pub store_name: String,
    pub budget: Option<f64>,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub checkout_date: Option<i64>,
    pub total_amount: Option<f64>,
    pub paid_with: Option<PaymentMethod>,
    pub amount_tendered: Option<f64>,
}

impl Trip {
    /// Column order: id, store_name, budget, created_at, updated_at,
    /// checkout_date, total_amount, paid_with, amount_tendered.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            store_name: row.get(1)?,
            budget: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            checkout_date: row.get(5)?,
            total_amount: row.get(6)?,
            paid_with: row.get(7)?,
            amount_tendered: row.get(8)?,
        })
    }
}

/// One line in a trip's cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroceryItem {
    pub id: String,
    pub barcode: String,
    pub description: String,
    pub price: f64,
    pub quantity: i64,
    pub unit: Unit,
    pub total: f64,
    pub grocery_id: String,
}

impl GroceryItem {
    /// Column order: id, barcode, description, price, quantity, unit,
    /// total, grocery_id.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            barcode: row.get(1)?,
            description: row.get(2)?,
            price: row.get(3)?,
            quantity: row.get(4)?,
            unit: row.get(5)?,
            total: row.get(6)?,
            grocery_id: row.get(7)?,
        })
    }
}

/// A shopping-list staging entry, independent of any trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    pub id: String,
    pub grocery_item_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub price: f64,
    pub checked: bool,
    pub created_at: i64,
}

impl ListEntry {
    /// Column order: id, grocery_item_id, description, quantity, price,
    /// checked, created_at.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            grocery_item_id: row.get(1)?,
            description: row.get(2)?,
            quantity: row.get(3)?,
            price: row.get(4)?,
            checked: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

/// Registered user. The password hash never leaves the users table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: i64,
}

impl User {
    /// Column order: id, name, email, created_at.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

/// Unit of measure for a cart item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    Pc,
    G,
    Lb,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::Pc => "pc",
            Self::G => "g",
            Self::Lb => "lb",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "kg" => Some(Self::Kg),
            "pc" => Some(Self::Pc),
            "g" => Some(Self::G),
            "lb" => Some(Self::Lb),
            _ => None,
        }
    }
}

impl FromSql for Unit {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| Self::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

impl ToSql for Unit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// Payment method recorded at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Credit,
    Debit,
    Gcash,
    Paymaya,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Credit => "credit",
            Self::Debit => "debit",
            Self::Gcash => "gcash",
            Self::Paymaya => "paymaya",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(Self::Cash),
            "credit" => Some(Self::Credit),
            "debit" => Some(Self::Debit),
            "gcash" => Some(Self::Gcash),
            "paymaya" => Some(Self::Paymaya),
            _ => None,
        }
    }
}

impl FromSql for PaymentMethod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()
            .and_then(|s| Self::parse(s).ok_or(FromSqlError::InvalidType))
    }
}

impl ToSql for PaymentMethod {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_round_trip() {
        for unit in [Unit::Kg, Unit::Pc, Unit::G, Unit::Lb] {
            assert_eq!(Unit::parse(unit.as_str()), Some(unit));
        }
        assert_eq!(Unit::parse("oz"), None);
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let item = GroceryItem {
            id: "i1".to_string(),
            barcode: "123".to_string(),
            description: "Milk".to_string(),
            price: 2.5,
            quantity: 2,
            unit: Unit::Pc,
            total: 5.0,
            grocery_id: "t1".to_string(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["groceryId"], "t1");
        assert_eq!(value["unit"], "pc");
    }
}
