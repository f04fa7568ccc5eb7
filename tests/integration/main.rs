//! Integration tests for the Manifold betting tools.
//!
//! Most tests drive the public API against `MockManifoldClient` and
//! in-memory forecast pages. Tests against the live API need
//! MANIFOLD_API_KEY, MANIFOLD_USER_ID and MANIFOLD_USERNAME.
//! Run them with: cargo test --test integration -- --ignored

use std::fs;
use std::time::Duration;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use time::macros::datetime;
use time::OffsetDateTime;

use manifold_bets::cache::CachedClient;
use manifold_bets::config::Config;
use manifold_bets::forecast::{ForecastEngine, StaticFetcher};
use manifold_bets::market::{
    Answer, ManifoldClient, Market, MarketApi, MarketFilter, MarketKind, MockManifoldClient,
    Outcome, ResolvedMarkets, SnapshotStore,
};
use manifold_bets::pricing::BetThresholds;
use manifold_bets::registry::{registry_stub, Registry};
use manifold_bets::strategy::{
    ArbBetter, ArbParams, ArbSettings, Sizing, ValueBetter, ValueParams, ValueSettings,
};
use manifold_bets::trading::BetSide;

fn market(id: &str, question: &str, probability: Decimal) -> Market {
    Market {
        id: id.to_string(),
        question: question.to_string(),
        kind: MarketKind::Binary { probability },
        is_resolved: false,
        close_time: None,
        last_updated: None,
        creator_username: "alice".to_string(),
        creator_name: "Alice".to_string(),
    }
}

/// Get a live config from environment.
fn live_config() -> Option<Config> {
    let config = Config::load().ok()?;
    config.validate().ok()?;
    Some(config)
}

const FORECAST_CSV: &str = "\
gender,forecast_date,team_name,rd7_win
mens,2023-03-12,Houston,0.40
mens,2023-03-14,Houston,0.253
mens,2023-03-14,Alabama,0.20
womens,2023-03-14,Houston,0.01
";

const REGISTRY: &str = r#"{
    "houston": {
        "question": "Will Houston win the tournament?",
        "group": "houston",
        "forecast": {"kind": "table", "url": "https://example.test/forecasts.csv",
                     "key_column": "team_name", "value_column": "rd7_win",
                     "keys": ["Houston"], "date_column": "forecast_date",
                     "filter": {"column": "gender", "value": "mens"}}
    },
    "houston-loses": {
        "question": "Will Houston fail to win the tournament?",
        "group": "!houston"
    },
    "either": {
        "question": "Will Houston or Alabama win?",
        "forecast": {"kind": "sum", "of": [
            {"kind": "table", "url": "https://example.test/forecasts.csv",
             "key_column": "team_name", "value_column": "rd7_win",
             "keys": ["Houston"], "date_column": "forecast_date",
             "filter": {"column": "gender", "value": "mens"}},
            {"kind": "fixed", "probability": "0.20"}
        ]}
    }
}"#;

fn write_registry(dir: &std::path::Path) -> Registry {
    let path = dir.join("registry.json");
    fs::write(&path, REGISTRY).unwrap();
    Registry::load(&path).unwrap()
}

#[tokio::test]
async fn value_round_uses_table_forecasts() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path());
    let mut resolved = ResolvedMarkets::load(dir.path().join("resolved.txt")).unwrap();

    let mock = MockManifoldClient::new();
    mock.set_balance(dec!(200));
    // Forecast 0.253 against a market at 0.35: bet NO down to 0.26.
    mock.add_market(market("houston", "Will Houston win the tournament?", dec!(0.35)));
    mock.add_market(market("houston-loses", "Will Houston fail to win?", dec!(0.70)));
    // Forecast 0.453 rounds to the market price: no bet.
    mock.add_market(market("either", "Will Houston or Alabama win?", dec!(0.45)));
    let client = CachedClient::new(mock.clone(), Duration::from_secs(60));

    let engine = ForecastEngine::new(
        StaticFetcher::new().with_page("https://example.test/forecasts.csv", FORECAST_CSV),
    );
    let settings = ValueSettings {
        params: ValueParams::new(
            BetThresholds::new(dec!(0.02), dec!(0.05)).unwrap(),
            Sizing::Fixed(dec!(10)),
        ),
        dry_run: false,
        question_filter: None,
        sleep: Duration::ZERO,
    };

    let mut rng = StdRng::seed_from_u64(7);
    let mut better = ValueBetter::new(&client, &engine, &registry, &mut resolved, settings);
    let bets = better.run(1, &mut rng).await.unwrap();

    assert_eq!(bets, 1);
    let placed = mock.placed_bets();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].contract_id, "houston");
    assert_eq!(placed[0].outcome, BetSide::Binary(Outcome::Down));
    assert_eq!(placed[0].limit_prob, Some(dec!(0.26)));
    assert_eq!(placed[0].amount, dec!(10));
    assert_eq!(mock.get_balance().await.unwrap(), dec!(190));
}

#[tokio::test]
async fn complementary_pair_is_bet_on_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path());
    let mut resolved = ResolvedMarkets::load(dir.path().join("resolved.txt")).unwrap();

    let client = MockManifoldClient::new();
    client.set_balance(dec!(100));
    client.add_market(market("houston", "Will Houston win the tournament?", dec!(0.35)));
    // 0.35 + 0.55 < 1: YES on both sides is underpriced.
    client.add_market(market("houston-loses", "Will Houston fail to win?", dec!(0.55)));

    let mut rng = StdRng::seed_from_u64(1);
    let pairs = registry.pairs(&resolved, &mut rng);
    assert_eq!(pairs.len(), 1);
    assert!(pairs[0].is_complementary);

    let settings = ArbSettings {
        params: ArbParams::new(dec!(0.02), dec!(10)).unwrap(),
        dry_run: false,
        question_filter: None,
        sleep: Duration::ZERO,
    };
    let mut better = ArbBetter::new(&client, &mut resolved, settings);
    let summary = better.run(&pairs).await.unwrap();
    assert_eq!(summary.pairs_bet, 1);

    let mut placed = client.placed_bets();
    placed.sort_by(|a, b| a.contract_id.cmp(&b.contract_id));
    // Limit 0.35 + 0.56 * 0.10 = 0.406 -> 0.41 in the first market's space.
    assert_eq!(placed[0].contract_id, "houston");
    assert_eq!(placed[0].outcome, BetSide::Binary(Outcome::Up));
    assert_eq!(placed[0].limit_prob, Some(dec!(0.41)));
    assert_eq!(placed[1].contract_id, "houston-loses");
    assert_eq!(placed[1].outcome, BetSide::Binary(Outcome::Up));
    assert_eq!(placed[1].limit_prob, Some(dec!(0.59)));
    // Legs scale with the win probability: 10 * 0.35 and 10 * 0.55.
    assert_eq!(placed[0].amount, dec!(4));
    assert_eq!(placed[1].amount, dec!(6));
}

#[test]
fn snapshot_discovery_and_stubs() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path());
    let store = SnapshotStore::new(dir.path().join("markets"));

    let mut closed = market("closed", "Will it snow in July?", dec!(0.01));
    closed.close_time = Some(datetime!(2024-02-01 0:00 UTC));
    let choice = Market {
        kind: MarketKind::MultipleChoice {
            answers: vec![Answer {
                id: "a1".to_string(),
                text: "Red".to_string(),
                probability: dec!(1),
            }],
        },
        ..market("choice", "Which color wins?", Decimal::ZERO)
    };
    let markets = vec![
        market("houston", "Will Houston win the tournament?", dec!(0.35)),
        market("new", "Will Houston win the NBA?", dec!(0.10)),
        closed,
        choice,
    ];

    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    store.save(&markets, date).unwrap();
    let latest = store.latest().unwrap();
    assert_eq!(latest, markets);

    let filter = MarketFilter {
        binary_only: true,
        exclude_ids: registry.ids().map(str::to_string).collect(),
        ..Default::default()
    };
    let now: OffsetDateTime = datetime!(2024-03-01 12:00 UTC);
    let found = filter.apply(&latest, now);
    let ids: Vec<&str> = found.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["new"]);

    let (id, entry) = registry_stub(found[0]);
    assert_eq!(id, "new");
    assert_eq!(entry.question, "Will Houston win the NBA?");
    assert!(entry.forecast.is_none());
}

#[test]
fn missing_snapshot_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("nothing"));
    assert!(store.latest().is_err());
}

/// Test that we can query the balance.
#[tokio::test]
#[ignore = "requires MANIFOLD_API_KEY"]
async fn test_get_balance() {
    let config = match live_config() {
        Some(c) => c,
        None => {
            println!("Skipping: Manifold credentials not set");
            return;
        }
    };

    let client = ManifoldClient::new(&config).unwrap();
    let result = client.get_balance().await;
    assert!(result.is_ok(), "Failed to get balance: {:?}", result.err());
    assert!(result.unwrap() >= Decimal::ZERO, "Balance should be non-negative");
}

/// Test that we can page through the market list.
#[tokio::test]
#[ignore = "requires network access"]
async fn test_list_markets() {
    let client = ManifoldClient::new(&Config::default()).unwrap();
    let markets = client.list_markets(None, 10).await;
    assert!(markets.is_ok(), "Failed to list markets: {:?}", markets.err());
    println!("Fetched {} markets", markets.unwrap().len());
}
