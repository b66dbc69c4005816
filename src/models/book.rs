//! Book (catalog) model and related types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Largest fee a NUMERIC(5, 2) column can hold
fn max_daily_fee() -> Decimal {
    Decimal::new(99999, 2)
}

/// Cover type of a book
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Cover {
    #[default]
    Hard,
    Soft,
}

impl Cover {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cover::Hard => "Hard",
            Cover::Soft => "Soft",
        }
    }
}

impl std::fmt::Display for Cover {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Cover {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hard" => Ok(Cover::Hard),
            "Soft" => Ok(Cover::Soft),
            _ => Err(format!("Invalid cover type: {}", s)),
        }
    }
}

// Stored as TEXT, constrained by a CHECK in the schema
impl sqlx::Type<Postgres> for Cover {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Cover {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Cover {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Book model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub cover: Cover,
    /// Copies currently available to borrow
    pub inventory: i32,
    /// Fee per borrowed day, two decimal places
    #[schema(value_type = String, example = "5.00")]
    pub daily_fee: Decimal,
}

/// Create (or fully replace) book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: String,
    #[serde(default)]
    pub cover: Cover,
    #[validate(range(min = 0, message = "Inventory cannot be negative"))]
    pub inventory: i32,
    #[schema(value_type = String, example = "5.00")]
    pub daily_fee: Decimal,
}

impl CreateBook {
    /// Run field validation, including the fee precision rule
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        check_daily_fee(self.daily_fee)
    }
}

/// Partial book update request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Author must be 1-255 characters"))]
    pub author: Option<String>,
    pub cover: Option<Cover>,
    #[validate(range(min = 0, message = "Inventory cannot be negative"))]
    pub inventory: Option<i32>,
    #[schema(value_type = Option<String>, example = "5.00")]
    pub daily_fee: Option<Decimal>,
}

impl UpdateBook {
    pub fn check(&self) -> AppResult<()> {
        self.validate()?;
        match self.daily_fee {
            Some(fee) => check_daily_fee(fee),
            None => Ok(()),
        }
    }

    /// Apply the present fields on top of an existing book
    pub fn apply_to(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(cover) = self.cover {
            book.cover = cover;
        }
        if let Some(inventory) = self.inventory {
            book.inventory = inventory;
        }
        if let Some(fee) = self.daily_fee {
            book.daily_fee = fee;
        }
    }
}

impl From<CreateBook> for UpdateBook {
    fn from(book: CreateBook) -> Self {
        Self {
            title: Some(book.title),
            author: Some(book.author),
            cover: Some(book.cover),
            inventory: Some(book.inventory),
            daily_fee: Some(book.daily_fee),
        }
    }
}

fn check_daily_fee(fee: Decimal) -> AppResult<()> {
    if fee.is_sign_negative() && !fee.is_zero() {
        return Err(AppError::Validation("daily_fee: cannot be negative".to_string()));
    }
    if fee.normalize().scale() > 2 {
        return Err(AppError::Validation(
            "daily_fee: at most 2 decimal places are allowed".to_string(),
        ));
    }
    if fee > max_daily_fee() {
        return Err(AppError::Validation(format!(
            "daily_fee: must not exceed {}",
            max_daily_fee()
        )));
    }
    Ok(())
}
