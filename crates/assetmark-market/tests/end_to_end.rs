//! End-to-end integration tests across all four components.
//!
//! These tests wire the real Registry, Ledger, Gateway, and Marketplace
//! together the way a deployment does:
//! Registry ← Marketplace (asset moves), Ledger ← Gateway (credit debits),
//! with a recording cash outlet standing in for the base-currency rail.
//!
//! They verify the cross-component invariants in realistic scenarios:
//! deduplicated registration, sale-split conservation, credit round
//! trips, metered payments in every currency, and pause semantics.

use assetmark_gateway::PaymentGateway;
use assetmark_ledger::CreditLedger;
use assetmark_market::{ListingState, Marketplace};
use assetmark_registry::AssetRegistry;
use assetmark_types::fakes::{CashOutlet, MemoryToken};
use assetmark_types::*;
use rust_decimal::Decimal;

fn dec(n: i64) -> Decimal {
    Decimal::new(n, 0)
}

/// Helper: a fully wired venue — all four components plus the accounts
/// that administer them.
struct Venue {
    registrar: AccountId,
    ledger_admin: AccountId,
    gateway_admin: AccountId,
    fee_recipient: AccountId,
    registry: AssetRegistry,
    ledger: CreditLedger,
    gateway: PaymentGateway,
    market: Marketplace,
    outlet: CashOutlet,
}

impl Venue {
    fn new() -> Self {
        let registrar = AccountId::new();
        let ledger_admin = AccountId::new();
        let gateway_admin = AccountId::new();
        let market_admin = AccountId::new();
        let fee_recipient = AccountId::new();
        let operator = AccountId::new();
        let treasury = AccountId::new();

        let registry = AssetRegistry::new(
            RegistryConfig::default(),
            AccessControl::single(Role::Registrar, registrar),
        );
        let mut ledger = CreditLedger::new(
            LedgerConfig::default(),
            AccessControl::single(Role::LedgerAdmin, ledger_admin),
        );
        let gateway = PaymentGateway::new(
            treasury,
            GatewayConfig::default(),
            AccessControl::single(Role::GatewayAdmin, gateway_admin),
        );
        let market = Marketplace::new(
            operator,
            MarketConfig {
                platform_fee_bps: 250,
                fee_recipient,
            },
            AccessControl::single(Role::MarketAdmin, market_admin),
        );

        // The gateway's treasury debits credit balances directly.
        ledger
            .set_authorized_spender(&ledger_admin, treasury, true)
            .unwrap();

        Self {
            registrar,
            ledger_admin,
            gateway_admin,
            fee_recipient,
            registry,
            ledger,
            gateway,
            market,
            outlet: CashOutlet::new(),
        }
    }

    /// Register an asset and pre-authorize the marketplace operator.
    fn register_for_sale(&mut self, seller: AccountId, external_id: &str) -> AssetId {
        let asset_id = self
            .registry
            .register(
                seller,
                "https://meta.assetmark.dev/records/x",
                "Process for widget lamination",
                "A. Inventor",
                external_id,
            )
            .unwrap();
        self.registry
            .set_operator(seller, self.market.operator(), true);
        asset_id
    }

    fn list(&mut self, seller: AccountId, asset_id: AssetId, price: Decimal) -> ListingId {
        self.market
            .list(&self.registry, seller, asset_id, price)
            .unwrap()
    }

    fn buy(
        &mut self,
        buyer: AccountId,
        listing_id: ListingId,
        attached: Decimal,
    ) -> assetmark_market::SaleReceipt {
        self.market
            .buy(&mut self.registry, &mut self.outlet, buyer, listing_id, attached)
            .unwrap()
    }
}

// =============================================================================
// Test: Full lifecycle — register, verify, list, buy, withdraw
// =============================================================================
#[test]
fn e2e_register_list_buy_withdraw() {
    let mut venue = Venue::new();
    let seller = AccountId::new();
    let buyer = AccountId::new();

    let asset_id = venue.register_for_sale(seller, "US 1234567");
    let registrar = venue.registrar;
    venue.registry.verify(&registrar, asset_id).unwrap();
    assert!(venue.registry.asset(asset_id).unwrap().verified);

    let listing_id = venue.list(seller, asset_id, dec(100));
    let receipt = venue.buy(buyer, listing_id, dec(100));

    // Split conservation: sellerPending + feePending == price.
    assert_eq!(
        receipt.seller_proceeds + receipt.platform_fee,
        receipt.price
    );
    assert_eq!(venue.registry.owner_of(asset_id).unwrap(), buyer);
    assert_eq!(
        venue.market.pending_of(&seller) + venue.market.pending_of(&venue.fee_recipient),
        dec(100)
    );
    venue.market.verify_conservation().unwrap();

    // Both parties pull their proceeds.
    let seller_amount = venue.market.withdraw(&seller, &mut venue.outlet).unwrap();
    let fee_recipient = venue.fee_recipient;
    let fee_amount = venue
        .market
        .withdraw(&fee_recipient, &mut venue.outlet)
        .unwrap();
    assert_eq!(seller_amount + fee_amount, dec(100));
    assert_eq!(venue.outlet.paid_to(&seller), seller_amount);
    venue.market.verify_conservation().unwrap();
}

// =============================================================================
// Test: Duplicate registration across spelling variants
// =============================================================================
#[test]
fn e2e_duplicate_registration_conflict() {
    let mut venue = Venue::new();
    let owner_a = AccountId::new();
    let owner_b = AccountId::new();

    let first = venue
        .registry
        .register(owner_a, "uri1", "T", "I", "US 1234567")
        .unwrap();
    assert_eq!(first, AssetId(1));

    // A different spelling of the same identifier must collide.
    let err = venue
        .registry
        .register(owner_b, "uri2", "T2", "I2", "us1234567")
        .unwrap_err();
    assert!(matches!(err, AssetmarkError::DuplicateExternalId { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(venue.registry.total_registered(), 1);
}

// =============================================================================
// Test: Credit purchase floors at the unit price
// =============================================================================
#[test]
fn e2e_credit_purchase_floor() {
    let mut venue = Venue::new();
    let payer = AccountId::new();

    // unit price 0.00002: purchase(0.1) → floor(0.1 / 0.00002) = 5000
    let credits = venue.ledger.purchase(payer, Decimal::new(1, 1)).unwrap();
    assert_eq!(credits, dec(5000));
    assert_eq!(venue.ledger.balance_of(&payer), dec(5000));
    assert_eq!(venue.ledger.total_supply(), dec(5000));
}

// =============================================================================
// Test: Buy with excess — refund, split, transfer, terminal state
// =============================================================================
#[test]
fn e2e_buy_with_excess_refund() {
    let mut venue = Venue::new();
    let seller = AccountId::new();
    let buyer = AccountId::new();

    let asset_id = venue.register_for_sale(seller, "US 1234567");
    let listing_id = venue.list(seller, asset_id, dec(100));

    let receipt = venue.buy(buyer, listing_id, dec(150));
    assert_eq!(receipt.refund, dec(50));
    assert_eq!(venue.outlet.paid_to(&buyer), dec(50));
    assert_eq!(receipt.platform_fee, Decimal::new(25, 1)); // 250 bps of 100
    assert_eq!(venue.registry.owner_of(asset_id).unwrap(), buyer);
    assert_eq!(
        venue.market.listing(listing_id).unwrap().state,
        ListingState::Sold
    );
}

// =============================================================================
// Test: Gateway pause blocks the identical call that succeeds after unpause
// =============================================================================
#[test]
fn e2e_gateway_pause_unpause() {
    let mut venue = Venue::new();
    let payer = AccountId::new();
    let price = venue.gateway.price_of(constants::BASE_CURRENCY).unwrap();
    let admin = venue.gateway_admin;

    venue.gateway.pause(&admin).unwrap();
    let err = venue
        .gateway
        .pay_with_base(payer, price, &mut venue.outlet)
        .unwrap_err();
    assert!(matches!(err, AssetmarkError::ComponentPaused));
    assert_eq!(venue.gateway.usage_count(&payer), 0);

    venue.gateway.unpause(&admin).unwrap();
    let receipt = venue
        .gateway
        .pay_with_base(payer, price, &mut venue.outlet)
        .unwrap();
    assert_eq!(receipt.usage_count, 1);
}

// =============================================================================
// Test: Credits pay for metered queries; revenue lands in the reserve
// =============================================================================
#[test]
fn e2e_credits_meter_queries_and_fund_revenue() {
    let mut venue = Venue::new();
    let payer = AccountId::new();

    venue.ledger.purchase(payer, Decimal::new(1, 1)).unwrap(); // 5000 credits
    let reserve_before = venue.ledger.reserve();

    // 25 credits per query.
    for expected_count in 1..=4_u64 {
        let receipt = venue
            .gateway
            .pay_with_credits(payer, &mut venue.ledger)
            .unwrap();
        assert_eq!(receipt.usage_count, expected_count);
    }
    assert_eq!(venue.ledger.balance_of(&payer), dec(4900));
    assert_eq!(venue.ledger.total_supply(), dec(4900));
    assert_eq!(
        venue.gateway.paid(&payer, constants::CREDIT_CURRENCY),
        dec(100)
    );

    // Spent credits were retired without a payout, so their backing cash
    // stays in the reserve as revenue the ledger admin can pull.
    assert_eq!(venue.ledger.reserve(), reserve_before);
    let admin = venue.ledger_admin;
    venue
        .ledger
        .withdraw_reserve(&admin, Decimal::new(2, 3), &mut venue.outlet)
        .unwrap();
    assert_eq!(venue.outlet.paid_to(&admin), Decimal::new(2, 3));
}

// =============================================================================
// Test: Round trip — redeem returns at most what was paid in
// =============================================================================
#[test]
fn e2e_purchase_redeem_round_trip() {
    let mut venue = Venue::new();
    let payer = AccountId::new();
    let paid = Decimal::new(1, 1);

    let supply_before = venue.ledger.total_supply();
    let credits = venue.ledger.purchase(payer, paid).unwrap();
    let returned = venue
        .ledger
        .redeem(payer, credits, &mut venue.outlet)
        .unwrap();

    assert!(returned <= paid);
    assert_eq!(returned, paid); // unit price unchanged → exact
    assert_eq!(venue.ledger.total_supply(), supply_before);
    assert_eq!(venue.ledger.balance_of(&payer), Decimal::ZERO);
}

// =============================================================================
// Test: External token payments pull exactly the price
// =============================================================================
#[test]
fn e2e_external_token_payment() {
    let mut venue = Venue::new();
    let payer = AccountId::new();
    let admin = venue.gateway_admin;
    let treasury = venue.gateway.treasury();

    venue
        .gateway
        .set_currency(
            &admin,
            CurrencyConfig {
                code: "USDC".to_string(),
                kind: CurrencyKind::External,
                price: Decimal::new(5, 1),
            },
        )
        .unwrap();

    let mut usdc = MemoryToken::new();
    usdc.fund(payer, dec(10));
    usdc.approve(&payer, &treasury, dec(10)).unwrap();

    venue.gateway.pay_with_token(payer, "USDC", &mut usdc).unwrap();
    venue.gateway.pay_with_token(payer, "USDC", &mut usdc).unwrap();

    assert_eq!(usdc.balance_of(&treasury), dec(1));
    assert_eq!(venue.gateway.collected("USDC"), dec(1));
    assert_eq!(venue.gateway.usage_count(&payer), 2);

    // Admin drains the token position.
    let drained = venue
        .gateway
        .withdraw_token(&admin, "USDC", &mut usdc)
        .unwrap();
    assert_eq!(drained, dec(1));
    assert_eq!(usdc.balance_of(&admin), dec(1));
}

// =============================================================================
// Test: Terminal listings stay terminal across the whole venue
// =============================================================================
#[test]
fn e2e_terminal_listing_stays_terminal() {
    let mut venue = Venue::new();
    let seller = AccountId::new();
    let buyer = AccountId::new();

    let asset_id = venue.register_for_sale(seller, "US 1234567");
    let listing_id = venue.list(seller, asset_id, dec(100));
    venue.buy(buyer, listing_id, dec(100));

    // Every later mutation of the sold listing fails.
    let late_buyer = AccountId::new();
    let err = venue
        .market
        .buy(
            &mut venue.registry,
            &mut venue.outlet,
            late_buyer,
            listing_id,
            dec(100),
        )
        .unwrap_err();
    assert!(matches!(err, AssetmarkError::ListingNotActive { .. }));
    assert!(venue.market.cancel(&seller, listing_id).is_err());
    assert!(venue
        .market
        .update_price(&seller, listing_id, dec(1))
        .is_err());

    // The buyer relists: a brand-new id, the old one untouched.
    venue
        .registry
        .set_operator(buyer, venue.market.operator(), true);
    let second = venue.list(buyer, asset_id, dec(120));
    assert_ne!(second, listing_id);
    assert_eq!(
        venue.market.listing(listing_id).unwrap().state,
        ListingState::Sold
    );
}

// =============================================================================
// Test: Many sales conserve every escrowed unit
// =============================================================================
#[test]
fn e2e_multi_sale_conservation() {
    let mut venue = Venue::new();
    let mut total_priced = Decimal::ZERO;

    for i in 0..5 {
        let seller = AccountId::new();
        let buyer = AccountId::new();
        let asset_id = venue.register_for_sale(seller, &format!("US 100000{i}"));
        let price = dec(100 + i);
        let listing_id = venue.list(seller, asset_id, price);
        let receipt = venue.buy(buyer, listing_id, price + dec(10));

        assert_eq!(receipt.seller_proceeds + receipt.platform_fee, price);
        total_priced += price;
        venue.market.verify_conservation().unwrap();
    }

    // The fee recipient's pending equals the sum of every platform cut.
    let expected_fees =
        total_priced * Decimal::from(250_u32) / Decimal::from(constants::BPS_DENOMINATOR);
    assert_eq!(venue.market.pending_of(&venue.fee_recipient), expected_fees);

    let fee_recipient = venue.fee_recipient;
    let pulled = venue
        .market
        .withdraw(&fee_recipient, &mut venue.outlet)
        .unwrap();
    assert_eq!(pulled, expected_fees);
    venue.market.verify_conservation().unwrap();
}

// =============================================================================
// Test: Reserve honesty — a drained reserve refuses redemption
// =============================================================================
#[test]
fn e2e_drained_reserve_blocks_redeem() {
    let mut venue = Venue::new();
    let payer = AccountId::new();
    let admin = venue.ledger_admin;

    venue.ledger.purchase(payer, Decimal::new(1, 1)).unwrap();
    venue
        .ledger
        .withdraw_reserve(&admin, Decimal::new(1, 1), &mut venue.outlet)
        .unwrap();

    // Supply arithmetic alone would allow this payout; the reserve does not.
    let err = venue
        .ledger
        .redeem(payer, dec(5000), &mut venue.outlet)
        .unwrap_err();
    assert!(matches!(err, AssetmarkError::InsufficientReserve { .. }));
    assert_eq!(venue.ledger.balance_of(&payer), dec(5000));
}

// =============================================================================
// Test: Event logs carry contiguous sequence numbers, successes only
// =============================================================================
#[test]
fn e2e_event_logs_are_contiguous() {
    let mut venue = Venue::new();
    let seller = AccountId::new();
    let buyer = AccountId::new();

    let asset_id = venue.register_for_sale(seller, "US 1234567");
    let listing_id = venue.list(seller, asset_id, dec(100));
    let _ = venue.market.buy(
        &mut venue.registry,
        &mut venue.outlet,
        seller, // self-trade, fails, must not log
        listing_id,
        dec(100),
    );
    venue.buy(buyer, listing_id, dec(100));

    for log in [venue.registry.events(), venue.market.events()] {
        let seqs: Vec<u64> = log.records().iter().map(|r| r.seq).collect();
        let expected: Vec<u64> = (1..=seqs.len() as u64).collect();
        assert_eq!(seqs, expected);
    }
    let market_labels: Vec<&str> = venue
        .market
        .events()
        .records()
        .iter()
        .map(|r| r.event.label())
        .collect();
    assert_eq!(market_labels, vec!["LISTED", "SOLD"]);
}
