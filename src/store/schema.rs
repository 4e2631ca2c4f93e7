//! Table DDL and bootstrap seed data.
//!
//! Seed data (`DERIVED`, `AGENTS`, `BOOT_EDGES`) is fixed and versioned here so the
//! bootstrap-determinism test has concrete data to assert against.

pub const CREATE_TABLES_SQL: &str = "
CREATE TABLE IF NOT EXISTS meta (
    k TEXT PRIMARY KEY,
    v TEXT
);

CREATE TABLE IF NOT EXISTS nodes (
    node_id TEXT PRIMARY KEY,
    kind TEXT NOT NULL,
    label TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    score REAL NOT NULL DEFAULT 0.0,
    degree INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    last_touched TEXT
);

CREATE TABLE IF NOT EXISTS edges (
    edge_id INTEGER PRIMARY KEY AUTOINCREMENT,
    node_a TEXT NOT NULL,
    node_b TEXT NOT NULL,
    weight REAL NOT NULL DEFAULT 0.0,
    top_channel TEXT,
    created_at TEXT NOT NULL,
    last_assessed TEXT,
    assessment_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(node_a, node_b)
);

CREATE TABLE IF NOT EXISTS edge_channels (
    edge_id INTEGER NOT NULL,
    channel TEXT NOT NULL,
    strength REAL NOT NULL,
    PRIMARY KEY (edge_id, channel)
);

CREATE TABLE IF NOT EXISTS snapshots (
    snapshot_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    prices_json TEXT NOT NULL,
    bells_json TEXT NOT NULL,
    indicators_json TEXT NOT NULL,
    signals_json TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS portfolio (
    k TEXT PRIMARY KEY,
    v TEXT
);

CREATE TABLE IF NOT EXISTS positions (
    symbol TEXT PRIMARY KEY,
    qty REAL NOT NULL,
    avg_cost REAL NOT NULL,
    last_price REAL NOT NULL DEFAULT 0.0,
    updated_at TEXT,
    executed_at TEXT
);

CREATE TABLE IF NOT EXISTS trades (
    trade_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    symbol TEXT NOT NULL,
    side TEXT NOT NULL,
    qty REAL NOT NULL,
    price REAL NOT NULL,
    notional REAL NOT NULL,
    reason TEXT NOT NULL DEFAULT '',
    insight_id INTEGER
);

CREATE TABLE IF NOT EXISTS insights (
    insight_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    agents_json TEXT NOT NULL,
    decisions_json TEXT NOT NULL,
    confidence REAL NOT NULL,
    critic_score REAL NOT NULL,
    starred INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'new',
    evidence_snapshot_id INTEGER
);

CREATE TABLE IF NOT EXISTS dream_log (
    log_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    action TEXT NOT NULL,
    detail TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS ticker_lookups (
    lookup_id INTEGER PRIMARY KEY AUTOINCREMENT,
    ts TEXT NOT NULL,
    ticker TEXT NOT NULL,
    success INTEGER NOT NULL DEFAULT 1,
    price REAL,
    change_pct REAL,
    volume INTEGER
);
";

/// Base weight per channel kind, used by `edge_weight_top`.
pub fn channel_base_weight(base: &str) -> f64 {
    match base {
        "correlates" | "inverse_correlates" => 1.00,
        "drives" => 0.90,
        "results_from" | "hedges" => 0.80,
        "leads" | "lags" | "liquidity_coupled" | "sentiment_coupled" | "narrative_contradicts" => {
            0.70
        }
        "policy_exposed" | "supply_chain_linked" => 0.60,
        "narrative_supports" => 0.50,
        _ => 0.50,
    }
}

/// `(node_id, kind, label, description)` — derived signal/regime/narrative nodes.
pub const DERIVED: &[(&str, &str, &str, &str)] = &[
    (
        "SIG_RISK_OFF",
        "signal",
        "Risk-Off Pressure",
        "Higher when volatility rises, equities weaken, USD strengthens.",
    ),
    (
        "SIG_RATES_UP",
        "signal",
        "Rates Pressure",
        "Higher when long yields rise and duration suffers.",
    ),
    (
        "SIG_OIL_SHOCK",
        "signal",
        "Oil Shock",
        "Higher when crude spikes and inflation impulse rises.",
    ),
    (
        "SIG_SEMI_PULSE",
        "signal",
        "Semis Pulse",
        "Higher when semis leadership is strong.",
    ),
    (
        "REG_RISK_OFF",
        "regime",
        "Risk-Off Regime",
        "Volatility/funding dominate; prefer defensives/cash.",
    ),
    (
        "REG_RISK_ON",
        "regime",
        "Risk-On Regime",
        "Breadth improves; cyclicals/tech do better.",
    ),
    (
        "REG_INFLATION",
        "regime",
        "Inflation Pressure",
        "Energy + yields up; rotate exposures carefully.",
    ),
    (
        "NAR_STORY",
        "narrative",
        "Market Narrative",
        "A rolling narrative summary from the agent committee.",
    ),
];

/// `(node_id, kind, label, description)` — committee agent nodes.
pub const AGENTS: &[(&str, &str, &str, &str)] = &[
    (
        "AGENT_MACRO",
        "agent",
        "Agent: Macro",
        "Summarizes bellwethers and regime.",
    ),
    (
        "AGENT_TECH",
        "agent",
        "Agent: Technical",
        "Scans indicators/momentum/mean-reversion.",
    ),
    (
        "AGENT_RISK",
        "agent",
        "Agent: Risk",
        "Controls drawdown/turnover/cash buffer; suggests trims.",
    ),
    (
        "AGENT_ALLOC",
        "agent",
        "Agent: Allocator",
        "Integrates inputs into final BUY/SELL/HOLD decisions.",
    ),
];

/// `(node_a, node_b, &[(channel, strength)])` — seed edges inserted on first bootstrap.
pub const BOOT_EDGES: &[(&str, &str, &[(&str, f64)])] = &[
    ("^VIX", "SIG_RISK_OFF", &[("drives:^VIX->SIG_RISK_OFF", 0.80)]),
    ("UUP", "SIG_RISK_OFF", &[("drives:UUP->SIG_RISK_OFF", 0.55)]),
    ("SPY", "SIG_RISK_OFF", &[("inverse_correlates", 0.55)]),
    (
        "^TNX",
        "SIG_RATES_UP",
        &[("drives:^TNX->SIG_RATES_UP", 0.75)],
    ),
    (
        "CL=F",
        "SIG_OIL_SHOCK",
        &[("drives:CL=F->SIG_OIL_SHOCK", 0.70)],
    ),
    (
        "TSM",
        "SIG_SEMI_PULSE",
        &[("drives:TSM->SIG_SEMI_PULSE", 0.55)],
    ),
    (
        "SIG_RISK_OFF",
        "REG_RISK_OFF",
        &[("drives:SIG_RISK_OFF->REG_RISK_OFF", 0.70)],
    ),
    ("SIG_RISK_OFF", "REG_RISK_ON", &[("inverse_correlates", 0.55)]),
    (
        "SIG_OIL_SHOCK",
        "REG_INFLATION",
        &[("drives:SIG_OIL_SHOCK->REG_INFLATION", 0.60)],
    ),
    (
        "AGENT_ALLOC",
        "NAR_STORY",
        &[("narrative_supports", 0.60)],
    ),
];
