use chrono::{SecondsFormat, Utc};

use crate::{Error, Result};

/// A completed purchase, reported as a conversion.
///
/// Customer data is kept in plain text here and hashed only when the conversion payload is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    order_id: String,
    created_at: String,
    items: Vec<OrderItem>,
    customer_email: String,
    customer_phone: Option<String>,
    customer_document: Option<String>,
    customer_first_name: Option<String>,
    customer_last_name: Option<String>,
    gender: Option<String>,
    state: Option<String>,
    city: Option<String>,
    is_company: Option<bool>,
}

const GENDERS: [&str; 3] = ["F", "M", "O"];

impl Order {
    /// Create an order created now.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if `order_id` or `customer_email` is blank or `items` is empty.
    pub fn new(
        order_id: impl Into<String>,
        items: Vec<OrderItem>,
        customer_email: impl Into<String>,
    ) -> Result<Order> {
        let order_id = order_id.into();
        let customer_email = customer_email.into();
        if order_id.trim().is_empty() {
            return Err(Error::validation("order id cannot be blank"));
        }
        if items.is_empty() {
            return Err(Error::validation("order must have at least one item"));
        }
        if customer_email.trim().is_empty() {
            return Err(Error::validation("customer email cannot be blank"));
        }

        Ok(Order {
            order_id,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            items,
            customer_email,
            customer_phone: None,
            customer_document: None,
            customer_first_name: None,
            customer_last_name: None,
            gender: None,
            state: None,
            city: None,
            is_company: None,
        })
    }

    /// Override the creation timestamp (ISO 8601, UTC).
    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Order {
        self.created_at = created_at.into();
        self
    }

    /// Customer phone number.
    pub fn with_customer_phone(mut self, phone: impl Into<String>) -> Order {
        self.customer_phone = Some(phone.into());
        self
    }

    /// Tax document (e.g. CPF/CNPJ).
    pub fn with_customer_document(mut self, document: impl Into<String>) -> Order {
        self.customer_document = Some(document.into());
        self
    }

    /// Customer first and last name.
    pub fn with_customer_name(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Order {
        self.customer_first_name = Some(first_name.into());
        self.customer_last_name = Some(last_name.into());
        self
    }

    /// Customer gender.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] unless `gender` is one of `F`, `M` or `O`.
    pub fn with_gender(mut self, gender: impl Into<String>) -> Result<Order> {
        let gender = gender.into();
        if !GENDERS.contains(&gender.as_str()) {
            return Err(Error::validation(
                "gender must be F (female), M (male), or O (other)",
            ));
        }
        self.gender = Some(gender);
        Ok(self)
    }

    /// Customer location: state (UF) and city.
    pub fn with_location(mut self, state: impl Into<String>, city: impl Into<String>) -> Order {
        self.state = Some(state.into());
        self.city = Some(city.into());
        self
    }

    /// Whether the customer is a company.
    pub fn with_is_company(mut self, is_company: bool) -> Order {
        self.is_company = Some(is_company);
        self
    }

    /// Publisher order id.
    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    /// Creation time, ISO 8601 UTC.
    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    /// Order lines.
    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    /// Customer email, unhashed.
    pub fn customer_email(&self) -> &str {
        &self.customer_email
    }

    /// Customer phone, unhashed.
    pub fn customer_phone(&self) -> Option<&str> {
        self.customer_phone.as_deref()
    }

    /// Tax document, unhashed.
    pub fn customer_document(&self) -> Option<&str> {
        self.customer_document.as_deref()
    }

    /// Customer first name, unhashed.
    pub fn customer_first_name(&self) -> Option<&str> {
        self.customer_first_name.as_deref()
    }

    /// Customer last name, unhashed.
    pub fn customer_last_name(&self) -> Option<&str> {
        self.customer_last_name.as_deref()
    }

    /// Customer gender.
    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    /// Customer state (UF).
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    /// Customer city.
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// Whether the customer is a company.
    pub fn is_company(&self) -> Option<bool> {
        self.is_company
    }
}

/// A line of an [`Order`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    product_sku: String,
    quantity: u32,
    price: f64,
    seller_id: Option<String>,
}

impl OrderItem {
    /// `price` is the unit price.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if the SKU is blank, `quantity` is zero, or `price` is negative or
    /// not a number.
    pub fn new(product_sku: impl Into<String>, quantity: u32, price: f64) -> Result<OrderItem> {
        let product_sku = product_sku.into();
        if product_sku.trim().is_empty() {
            return Err(Error::validation("product sku cannot be blank"));
        }
        if quantity == 0 {
            return Err(Error::validation("quantity must be greater than 0"));
        }
        if !(price >= 0.0) {
            return Err(Error::validation("price cannot be negative"));
        }

        Ok(OrderItem {
            product_sku,
            quantity,
            price,
            seller_id: None,
        })
    }

    /// Marketplace seller of this line.
    pub fn with_seller_id(mut self, seller_id: impl Into<String>) -> OrderItem {
        self.seller_id = Some(seller_id.into());
        self
    }

    /// Purchased product.
    pub fn product_sku(&self) -> &str {
        &self.product_sku
    }

    /// Units purchased.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price.
    pub fn price(&self) -> f64 {
        self.price
    }

    /// Marketplace seller, if any.
    pub fn seller_id(&self) -> Option<&str> {
        self.seller_id.as_deref()
    }
}
