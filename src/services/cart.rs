use crate::{
    entities::order::OrderItem,
    errors::ServiceError,
    services::pricing::{display_price, PricingConfig},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

pub const EMPTY_SELECTION_MESSAGE: &str = "Select at least one product to proceed to checkout.";

/// Stable identity of a cart line, assigned when the line is first added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineId(Uuid);

impl LineId {
    fn generate() -> Self {
        LineId(Uuid::new_v4())
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Product snapshot taken when the shopper adds it to the cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub selected_size: Option<String>,
    pub selected_color: Option<String>,
    pub customization: Option<String>,
    pub quantity: u32,
}

impl CartItem {
    pub fn new(product_id: Uuid, name: impl Into<String>, price: Decimal, quantity: u32) -> Self {
        Self {
            product_id,
            name: name.into(),
            price,
            image: None,
            selected_size: None,
            selected_color: None,
            customization: None,
            quantity,
        }
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.selected_size = non_blank(size.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.selected_color = non_blank(color.into());
        self
    }

    pub fn with_customization(mut self, text: impl Into<String>) -> Self {
        self.customization = non_blank(text.into());
        self
    }

    fn same_identity(&self, other: &CartItem) -> bool {
        self.product_id == other.product_id
            && self.selected_size == other.selected_size
            && self.selected_color == other.selected_color
            && self.customization == other.customization
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: LineId,
    pub item: CartItem,
}

impl CartLine {
    /// Line subtotal in canonical units
    pub fn subtotal(&self) -> Decimal {
        self.item.price * Decimal::from(self.item.quantity)
    }

    pub fn to_order_item(&self) -> OrderItem {
        OrderItem {
            product_id: self.item.product_id,
            name: self.item.name.clone(),
            price: self.item.price,
            quantity: self.item.quantity,
            selected_size: self.item.selected_size.clone(),
            selected_color: self.item.selected_color.clone(),
            customization: self.item.customization.clone(),
        }
    }
}

/// Shopper's cart: ordered lines plus the subset selected for checkout.
///
/// Lines are addressed by [`LineId`] rather than position. Adding or
/// removing a line resets the selection to every line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    selected: HashSet<LineId>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds an item, merging into an existing line with the same
    /// (product, size, color, customization) identity.
    pub fn add(&mut self, item: CartItem) -> Result<LineId, ServiceError> {
        if item.quantity == 0 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let id = match self.lines.iter_mut().find(|line| line.item.same_identity(&item)) {
            Some(line) => {
                line.item.quantity = line
                    .item
                    .quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| {
                        ServiceError::ValidationError("Quantity is too large".to_string())
                    })?;
                line.id
            }
            None => {
                let id = LineId::generate();
                self.lines.push(CartLine { id, item });
                id
            }
        };

        self.select_all();
        Ok(id)
    }

    /// Removes a line; returns whether it existed
    pub fn remove(&mut self, id: LineId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.id != id);
        let removed = self.lines.len() != before;
        if removed {
            self.select_all();
        }
        removed
    }

    pub fn toggle_select(&mut self, id: LineId) {
        if !self.lines.iter().any(|line| line.id == id) {
            return;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.lines.iter().map(|line| line.id).collect();
    }

    pub fn is_selected(&self, id: LineId) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected_lines(&self) -> Vec<&CartLine> {
        self.lines
            .iter()
            .filter(|line| self.selected.contains(&line.id))
            .collect()
    }

    /// Display-currency total of the selected lines
    pub fn compute_total(&self, cfg: &PricingConfig) -> Decimal {
        self.selected_lines()
            .into_iter()
            .map(|line| {
                display_price(line.item.price, None, cfg).final_price
                    * Decimal::from(line.item.quantity)
            })
            .sum()
    }

    /// Canonical-unit subtotal of the selected lines
    pub fn canonical_subtotal(&self) -> Decimal {
        self.selected_lines()
            .into_iter()
            .map(CartLine::subtotal)
            .sum()
    }

    /// Lines to check out; an empty selection is rejected
    pub fn checkout_selection(&self) -> Result<Vec<CartLine>, ServiceError> {
        let selected: Vec<CartLine> = self.selected_lines().into_iter().cloned().collect();
        if selected.is_empty() {
            return Err(ServiceError::ValidationError(
                EMPTY_SELECTION_MESSAGE.to_string(),
            ));
        }
        Ok(selected)
    }

    /// Drops the checked-out lines after an order was persisted
    pub fn clear_checked_out(&mut self) {
        let selected = std::mem::take(&mut self.selected);
        self.lines.retain(|line| !selected.contains(&line.id));
        self.select_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pricing::Currency;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn sign(price: Decimal, qty: u32) -> CartItem {
        CartItem::new(Uuid::nil(), "Welcome Sign", price, qty)
            .with_size("18x24")
            .with_color("White")
    }

    #[test]
    fn identical_items_merge_with_summed_quantity() {
        let mut cart = Cart::new();
        let first = cart.add(sign(dec!(50), 1)).unwrap();
        let second = cart.add(sign(dec!(50), 2)).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].item.quantity, 3);
    }

    #[test]
    fn different_customization_creates_new_line() {
        let mut cart = Cart::new();
        cart.add(sign(dec!(50), 1).with_customization("Emma & Liam"))
            .unwrap();
        cart.add(sign(dec!(50), 1).with_customization("Ava & Noah"))
            .unwrap();
        cart.add(sign(dec!(50), 1).with_color("Black")).unwrap();
        assert_eq!(cart.len(), 3);
    }

    #[test]
    fn blank_options_normalise_to_none() {
        let mut cart = Cart::new();
        cart.add(CartItem::new(Uuid::nil(), "Menu", dec!(5), 1).with_customization("  "))
            .unwrap();
        cart.add(CartItem::new(Uuid::nil(), "Menu", dec!(5), 1)).unwrap();
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn zero_quantity_rejected() {
        let mut cart = Cart::new();
        assert_matches!(
            cart.add(sign(dec!(50), 0)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn merged_quantity_overflow_is_rejected() {
        let mut cart = Cart::new();
        cart.add(sign(dec!(50), u32::MAX)).unwrap();
        assert_matches!(
            cart.add(sign(dec!(50), 1)),
            Err(ServiceError::ValidationError(m)) if m == "Quantity is too large"
        );
        assert_eq!(cart.lines()[0].item.quantity, u32::MAX);
    }

    #[test]
    fn add_and_remove_reset_selection_to_all() {
        let mut cart = Cart::new();
        let a = cart.add(sign(dec!(50), 1)).unwrap();
        let b = cart
            .add(CartItem::new(Uuid::new_v4(), "Bar Menu", dec!(20), 1))
            .unwrap();

        cart.toggle_select(a);
        assert!(!cart.is_selected(a));
        assert!(cart.is_selected(b));

        let c = cart
            .add(CartItem::new(Uuid::new_v4(), "Place Card", dec!(2), 10))
            .unwrap();
        assert!(cart.is_selected(a) && cart.is_selected(b) && cart.is_selected(c));

        cart.toggle_select(b);
        assert!(cart.remove(c));
        assert!(cart.is_selected(a) && cart.is_selected(b));
        assert!(!cart.remove(c));
    }

    #[test]
    fn checkout_rejects_empty_selection() {
        let mut cart = Cart::new();
        let ids: Vec<LineId> = (0..3)
            .map(|i| {
                cart.add(CartItem::new(Uuid::new_v4(), format!("Sign {i}"), dec!(10), 1))
                    .unwrap()
            })
            .collect();
        for id in &ids {
            cart.toggle_select(*id);
        }

        let err = cart.checkout_selection().unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(ref msg) if msg == EMPTY_SELECTION_MESSAGE);
        assert_eq!(cart.len(), 3);
    }

    #[test]
    fn totals_cover_only_selected_lines() {
        let mut cart = Cart::new();
        let a = cart.add(sign(dec!(50), 2)).unwrap();
        cart.add(CartItem::new(Uuid::new_v4(), "Bar Menu", dec!(20), 1))
            .unwrap();

        let usd_discounted = PricingConfig::new(Currency::Usd, dec!(10)).unwrap();
        assert_eq!(cart.compute_total(&usd_discounted), dec!(108));
        assert_eq!(cart.canonical_subtotal(), dec!(120));

        cart.toggle_select(a);
        let eur = PricingConfig::new(Currency::Eur, Decimal::ZERO).unwrap();
        assert_eq!(cart.compute_total(&eur), dec!(18.4));
        assert_eq!(cart.canonical_subtotal(), dec!(20));
    }

    #[test]
    fn clearing_checked_out_keeps_unselected_lines() {
        let mut cart = Cart::new();
        let a = cart.add(sign(dec!(50), 1)).unwrap();
        let b = cart
            .add(CartItem::new(Uuid::new_v4(), "Bar Menu", dec!(20), 1))
            .unwrap();
        cart.toggle_select(b);

        cart.clear_checked_out();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].id, b);
        assert!(cart.is_selected(b));
        assert!(!cart.is_selected(a));
    }
}
