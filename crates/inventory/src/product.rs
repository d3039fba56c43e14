use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Aggregate, AggregateRoot, DomainError, ProductIdentifier};

use crate::change::{OperationKind, Quantities, QuantityChanged, QuantityDeltas};

/// A single stock operation and its quantity argument.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "quantity", rename_all = "snake_case")]
pub enum StockOperation {
    /// Set the initial store quantity of an unregistered product.
    Register(i64),
    /// Set the store quantity to a new absolute value.
    ChangeQuantity(i64),
    /// Move units from available to reserved.
    Reserve(i64),
    /// Move units from reserved to sold.
    Sell(i64),
    /// Move units from reserved back to available.
    Expire(i64),
    /// Move units from sold back to available.
    Refund(i64),
}

impl StockOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            StockOperation::Register(_) => OperationKind::Register,
            StockOperation::ChangeQuantity(_) => OperationKind::ChangeQuantity,
            StockOperation::Reserve(_) => OperationKind::Reserve,
            StockOperation::Sell(_) => OperationKind::Sell,
            StockOperation::Expire(_) => OperationKind::Expire,
            StockOperation::Refund(_) => OperationKind::Refund,
        }
    }

    pub fn quantity(&self) -> i64 {
        match *self {
            StockOperation::Register(q)
            | StockOperation::ChangeQuantity(q)
            | StockOperation::Reserve(q)
            | StockOperation::Sell(q)
            | StockOperation::Expire(q)
            | StockOperation::Refund(q) => q,
        }
    }
}

/// Command: apply one stock operation to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCommand {
    pub identifier: ProductIdentifier,
    pub operation: StockOperation,
    pub occurred_at: DateTime<Utc>,
}

impl StockCommand {
    pub fn new(identifier: ProductIdentifier, operation: StockOperation) -> Self {
        Self {
            identifier,
            operation,
            occurred_at: Utc::now(),
        }
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

/// Aggregate root: ProductStock.
///
/// Holds the current quantities of one product. `store_quantity` always equals
/// available + reserved + sold; none of them ever goes negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStock {
    id: ProductIdentifier,
    registered: bool,
    store_quantity: i64,
    quantities: Quantities,
    version: u64,
}

impl ProductStock {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: ProductIdentifier) -> Self {
        Self {
            id,
            registered: false,
            store_quantity: 0,
            quantities: Quantities::ZERO,
            version: 0,
        }
    }

    /// Rebuild an aggregate by folding its change records from the empty state.
    pub fn replay<'a>(
        id: ProductIdentifier,
        records: impl IntoIterator<Item = &'a QuantityChanged>,
    ) -> Self {
        let mut stock = Self::empty(id);
        for record in records {
            stock.apply(record);
        }
        stock
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn store_quantity(&self) -> i64 {
        self.store_quantity
    }

    pub fn available_quantity(&self) -> i64 {
        self.quantities.available_quantity
    }

    pub fn reserved_quantity(&self) -> i64 {
        self.quantities.reserved_quantity
    }

    pub fn sold_quantity(&self) -> i64 {
        self.quantities.sold_quantity
    }

    pub fn quantities(&self) -> Quantities {
        self.quantities
    }

    /// Check the bucket invariants. Returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if !self.quantities.is_non_negative() {
            return Err(format!("negative quantity: {:?}", self.quantities));
        }
        if self.store_quantity != self.quantities.store_quantity() {
            return Err(format!(
                "store quantity {} does not match available + reserved + sold = {}",
                self.store_quantity,
                self.quantities.store_quantity()
            ));
        }
        Ok(())
    }

    pub fn register(&self, quantity: i64) -> Result<(Self, QuantityChanged), DomainError> {
        self.execute(&self.command(StockOperation::Register(quantity)))
    }

    pub fn change_quantity(&self, quantity: i64) -> Result<(Self, QuantityChanged), DomainError> {
        self.execute(&self.command(StockOperation::ChangeQuantity(quantity)))
    }

    pub fn reserve(&self, quantity: i64) -> Result<(Self, QuantityChanged), DomainError> {
        self.execute(&self.command(StockOperation::Reserve(quantity)))
    }

    pub fn sell(&self, quantity: i64) -> Result<(Self, QuantityChanged), DomainError> {
        self.execute(&self.command(StockOperation::Sell(quantity)))
    }

    pub fn expire(&self, quantity: i64) -> Result<(Self, QuantityChanged), DomainError> {
        self.execute(&self.command(StockOperation::Expire(quantity)))
    }

    pub fn refund(&self, quantity: i64) -> Result<(Self, QuantityChanged), DomainError> {
        self.execute(&self.command(StockOperation::Refund(quantity)))
    }

    fn command(&self, operation: StockOperation) -> StockCommand {
        StockCommand::new(self.id.clone(), operation)
    }
}

impl AggregateRoot for ProductStock {
    type Id = ProductIdentifier;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

impl Aggregate for ProductStock {
    type Command = StockCommand;
    type Event = QuantityChanged;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        if event.operation == OperationKind::Register {
            self.registered = true;
        }
        self.quantities = self.quantities.apply(event.deltas);
        self.store_quantity += event.deltas.store_delta();

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Self::Event, Self::Error> {
        if command.identifier != self.id {
            return Err(DomainError::invariant(format!(
                "command for {} sent to {}",
                command.identifier, self.id
            )));
        }

        let deltas = self.decide(command.operation)?;

        Ok(QuantityChanged {
            identifier: self.id.clone(),
            operation: command.operation.kind(),
            quantity: command.operation.quantity(),
            resulting: self.quantities.apply(deltas),
            deltas,
            occurred_at: command.occurred_at,
        })
    }
}

impl ProductStock {
    fn ensure_registered(&self) -> Result<(), DomainError> {
        if !self.registered {
            return Err(DomainError::unknown(self.id.clone()));
        }
        Ok(())
    }

    /// Validate an operation against current state and compute its deltas.
    /// Nothing is mutated; a rejection leaves the aggregate as it was.
    ///
    /// Registration state is checked first, then the sign of the quantity,
    /// then the operation's own precondition.
    fn decide(&self, operation: StockOperation) -> Result<QuantityDeltas, DomainError> {
        match operation {
            StockOperation::Register(_) if self.registered => {
                return Err(DomainError::already_registered(self.id.clone()));
            }
            StockOperation::Register(_) => {}
            _ => self.ensure_registered()?,
        }

        let quantity = operation.quantity();
        if quantity < 0 {
            return Err(DomainError::invalid_quantity(format!(
                "{} quantity cannot be negative (got {quantity})",
                operation.kind()
            )));
        }

        let (pool, deltas) = match operation {
            StockOperation::Register(_) => return Ok(QuantityDeltas::new(quantity, 0, 0)),
            StockOperation::ChangeQuantity(_) => {
                let committed = self.reserved_quantity() + self.sold_quantity();
                if quantity < committed {
                    return Err(DomainError::too_low(quantity, committed));
                }
                return Ok(QuantityDeltas::new(quantity - self.store_quantity, 0, 0));
            }
            StockOperation::Reserve(_) => (
                self.available_quantity(),
                QuantityDeltas::new(-quantity, quantity, 0),
            ),
            StockOperation::Sell(_) => (
                self.reserved_quantity(),
                QuantityDeltas::new(0, -quantity, quantity),
            ),
            StockOperation::Expire(_) => (
                self.reserved_quantity(),
                QuantityDeltas::new(quantity, -quantity, 0),
            ),
            StockOperation::Refund(_) => (
                self.sold_quantity(),
                QuantityDeltas::new(quantity, 0, -quantity),
            ),
        };

        if quantity > pool {
            return Err(DomainError::too_big(quantity, pool));
        }
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_id() -> ProductIdentifier {
        "WROCLOVE2014".parse().unwrap()
    }

    fn registered(quantity: i64) -> ProductStock {
        let (stock, _) = ProductStock::empty(test_id()).register(quantity).unwrap();
        stock
    }

    #[test]
    fn register_sets_store_and_available() {
        let (stock, record) = ProductStock::empty(test_id()).register(10).unwrap();

        assert!(stock.is_registered());
        assert_eq!(stock.store_quantity(), 10);
        assert_eq!(stock.available_quantity(), 10);
        assert_eq!(stock.reserved_quantity(), 0);
        assert_eq!(stock.sold_quantity(), 0);
        assert_eq!(stock.version(), 1);

        assert_eq!(record.operation, OperationKind::Register);
        assert_eq!(record.deltas, QuantityDeltas::new(10, 0, 0));
        assert_eq!(record.resulting, stock.quantities());
    }

    #[test]
    fn register_twice_is_rejected() {
        let stock = registered(5);
        let err = stock.register(7).unwrap_err();
        assert_eq!(err, DomainError::AlreadyRegistered(test_id()));
    }

    #[test]
    fn operations_on_unregistered_product_fail_with_unknown_product() {
        let stock = ProductStock::empty(test_id());
        let results = [
            stock.change_quantity(1),
            stock.reserve(1),
            stock.sell(1),
            stock.expire(1),
            stock.refund(1),
        ];
        for result in results {
            match result.unwrap_err() {
                DomainError::UnknownProduct(id) => assert_eq!(id, test_id()),
                other => panic!("Expected UnknownProduct, got {other:?}"),
            }
        }
    }

    #[test]
    fn reserve_moves_available_to_reserved() {
        let (stock, record) = registered(10).reserve(5).unwrap();
        assert_eq!(stock.available_quantity(), 5);
        assert_eq!(stock.reserved_quantity(), 5);
        assert_eq!(record.deltas, QuantityDeltas::new(-5, 5, 0));
    }

    #[test]
    fn reserve_beyond_available_is_too_big() {
        let err = registered(10).reserve(11).unwrap_err();
        assert_eq!(err, DomainError::QuantityTooBig { requested: 11, limit: 10 });
    }

    #[test]
    fn sell_and_expire_are_bounded_by_reserved() {
        let (stock, _) = registered(10).reserve(3).unwrap();

        assert_eq!(
            stock.sell(4).unwrap_err(),
            DomainError::QuantityTooBig { requested: 4, limit: 3 }
        );
        assert_eq!(
            stock.expire(4).unwrap_err(),
            DomainError::QuantityTooBig { requested: 4, limit: 3 }
        );

        let (sold, _) = stock.sell(3).unwrap();
        assert_eq!(sold.reserved_quantity(), 0);
        assert_eq!(sold.sold_quantity(), 3);
        assert_eq!(sold.available_quantity(), 7);
    }

    #[test]
    fn refund_is_bounded_by_sold() {
        let (stock, _) = registered(10).reserve(5).unwrap();
        let (stock, _) = stock.sell(2).unwrap();

        assert_eq!(
            stock.refund(3).unwrap_err(),
            DomainError::QuantityTooBig { requested: 3, limit: 2 }
        );

        let (refunded, record) = stock.refund(2).unwrap();
        assert_eq!(refunded.sold_quantity(), 0);
        assert_eq!(refunded.available_quantity(), 7);
        assert_eq!(refunded.reserved_quantity(), 3);
        assert_eq!(record.deltas, QuantityDeltas::new(2, 0, -2));
    }

    #[test]
    fn change_quantity_below_committed_is_too_low() {
        let (stock, _) = registered(9).reserve(5).unwrap();
        let (stock, _) = stock.sell(4).unwrap();
        let (stock, record) = stock.change_quantity(5).unwrap();
        assert_eq!(record.deltas, QuantityDeltas::new(-4, 0, 0));
        assert_eq!(stock.available_quantity(), 0);

        let err = stock.change_quantity(4).unwrap_err();
        assert_eq!(err, DomainError::QuantityTooLow { requested: 4, minimum: 5 });
    }

    #[test]
    fn negative_quantities_are_rejected_before_anything_else() {
        let stock = registered(10);
        for result in [
            stock.change_quantity(-1),
            stock.reserve(-1),
            stock.sell(-1),
            stock.expire(-1),
            stock.refund(-1),
        ] {
            match result.unwrap_err() {
                DomainError::InvalidQuantity(_) => {}
                other => panic!("Expected InvalidQuantity, got {other:?}"),
            }
        }
        assert!(ProductStock::empty(test_id()).register(-3).is_err());
    }

    #[test]
    fn handle_rejects_command_for_other_product() {
        let stock = registered(10);
        let cmd = StockCommand::new("OTHER".parse().unwrap(), StockOperation::Reserve(1));
        match stock.handle(&cmd).unwrap_err() {
            DomainError::InvariantViolation(msg) if msg.contains("OTHER") => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn unregistered_product_is_unknown_whatever_the_quantity() {
        let stock = ProductStock::empty(test_id());
        for result in [stock.reserve(0), stock.sell(-1), stock.change_quantity(-5), stock.refund(0)] {
            match result.unwrap_err() {
                DomainError::UnknownProduct(id) => assert_eq!(id, test_id()),
                other => panic!("Expected UnknownProduct, got {other:?}"),
            }
        }
    }

    #[test]
    fn each_movement_draws_from_its_own_pool() {
        // available 5, reserved 3, sold 2
        let (stock, _) = registered(10).reserve(5).unwrap();
        let (stock, _) = stock.sell(2).unwrap();

        assert_eq!(stock.reserve(6).unwrap_err(), DomainError::too_big(6, 5));
        assert_eq!(stock.sell(4).unwrap_err(), DomainError::too_big(4, 3));
        assert_eq!(stock.expire(4).unwrap_err(), DomainError::too_big(4, 3));
        assert_eq!(stock.refund(3).unwrap_err(), DomainError::too_big(3, 2));

        assert_eq!(stock.expire(3).unwrap().1.deltas, QuantityDeltas::new(3, -3, 0));
        assert_eq!(stock.sell(3).unwrap().1.deltas, QuantityDeltas::new(0, -3, 3));
    }

    #[test]
    fn failed_operation_leaves_aggregate_unchanged() {
        let stock = registered(4);
        let before = stock.clone();
        let _ = stock.reserve(5);
        assert_eq!(stock, before);
    }

    #[test]
    fn replay_reproduces_snapshot() {
        let mut records = Vec::new();
        let (stock, r) = ProductStock::empty(test_id()).register(9).unwrap();
        records.push(r);
        let (stock, r) = stock.change_quantity(10).unwrap();
        records.push(r);
        let (stock, r) = stock.reserve(4).unwrap();
        records.push(r);
        let (stock, r) = stock.sell(2).unwrap();
        records.push(r);
        let (stock, r) = stock.refund(1).unwrap();
        records.push(r);

        let replayed = ProductStock::replay(test_id(), &records);
        assert_eq!(replayed, stock);
        assert!(replayed.check_invariants().is_ok());
    }

    #[test]
    fn operation_serializes_as_tagged_variant() {
        let json = serde_json::to_value(StockOperation::Reserve(3)).unwrap();
        assert_eq!(json["operation"], "reserve");
        assert_eq!(json["quantity"], 3);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        fn operation() -> impl Strategy<Value = StockOperation> {
            prop_oneof![
                (0i64..50).prop_map(StockOperation::ChangeQuantity),
                (0i64..20).prop_map(StockOperation::Reserve),
                (0i64..20).prop_map(StockOperation::Sell),
                (0i64..20).prop_map(StockOperation::Expire),
                (0i64..20).prop_map(StockOperation::Refund),
            ]
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 512,
                ..ProptestConfig::default()
            })]

            /// Property: no reachable state violates the bucket invariants, and
            /// rejected operations leave state untouched.
            #[test]
            fn invariants_hold_for_any_operation_sequence(
                initial in 0i64..50,
                ops in prop::collection::vec(operation(), 0..40),
            ) {
                let (mut stock, first) = ProductStock::empty(test_id()).register(initial).unwrap();
                let mut records = vec![first];

                for op in ops {
                    let before = stock.clone();
                    match stock.execute(&StockCommand::new(test_id(), op)) {
                        Ok((next, record)) => {
                            prop_assert!(record.is_consistent_with(&before.quantities()));
                            prop_assert_eq!(record.resulting, next.quantities());
                            stock = next;
                            records.push(record);
                        }
                        Err(_) => prop_assert_eq!(&stock, &before),
                    }
                    prop_assert!(stock.check_invariants().is_ok());
                    prop_assert_eq!(
                        stock.available_quantity() + stock.reserved_quantity() + stock.sold_quantity(),
                        stock.store_quantity()
                    );
                }

                prop_assert_eq!(ProductStock::replay(test_id(), &records), stock);
            }

            /// Property: handle is deterministic and does not mutate.
            #[test]
            fn handle_is_pure(initial in 0i64..50, op in operation()) {
                let stock = registered(initial);
                let before = stock.clone();
                let cmd = StockCommand::new(test_id(), op);

                let first = stock.handle(&cmd);
                let second = stock.handle(&cmd);

                prop_assert_eq!(first, second);
                prop_assert_eq!(stock, before);
            }
        }
    }
}
