use loopsim::domain::money::parse_usd;
use loopsim::domain::{GasConditions, MarketConditions, PriceTrend, SECONDS_PER_DAY};
use loopsim::engine::ledger::{INITIALIZE_STRATEGY, STRATEGY_COMPLETE};
use loopsim::engine::{MarketAnalyzer, ReentryRule, RiskEngine};
use loopsim::{
    simulate_strategy, HistoricalData, PricePoint, SimulationError, SimulationParams, StepType,
    StrategyPolicy, StrategyStep, Timestamp,
};

/// 2023-01-01T00:00:00Z
const T0: i64 = 1_672_531_200;
const CAPITAL: f64 = 10_000.0;

const EXIT_REASONS: [&str; 5] = [
    "Health factor below minimum threshold",
    "Position showing loss beyond safety margin",
    "Market volatility too high",
    "Locking in profits in downward trend",
    "High gas costs with existing profits",
];

fn series(prices: impl IntoIterator<Item = f64>) -> Vec<PricePoint> {
    prices
        .into_iter()
        .enumerate()
        .map(|(i, p)| PricePoint::new(T0 + i as i64 * SECONDS_PER_DAY, p))
        .collect()
}

fn linear(start: f64, step: f64, days: usize) -> Vec<PricePoint> {
    series((0..days).map(|i| start + step * i as f64))
}

fn data(eth: Vec<PricePoint>, wsteth: Vec<PricePoint>, gas: Vec<PricePoint>) -> HistoricalData {
    HistoricalData {
        eth_prices: eth,
        wsteth_prices: wsteth,
        gas_prices: gas,
    }
}

fn rising() -> HistoricalData {
    data(
        linear(2000.0, 10.0, 10),
        linear(2050.0, 12.0, 10),
        linear(30.0, 0.0, 10),
    )
}

/// Five days up, then five days falling 60/day on both assets.
fn crash() -> HistoricalData {
    let eth = (0..10).map(|i| {
        if i < 5 {
            2000.0 + 10.0 * i as f64
        } else {
            2040.0 - 60.0 * (i - 4) as f64
        }
    });
    let wsteth = (0..10).map(|i| {
        if i < 5 {
            2050.0 + 12.0 * i as f64
        } else {
            2098.0 - 60.0 * (i - 4) as f64
        }
    });
    data(series(eth), series(wsteth), linear(30.0, 0.0, 10))
}

fn orderly_decline() -> HistoricalData {
    data(
        linear(2000.0, -20.0, 30),
        linear(2050.0, -18.0, 30),
        linear(30.0, 0.0, 30),
    )
}

/// Four 12-day cycles: ETH climbs 10/day for 8 days then drops 30/day for 4,
/// while wstETH climbs 30/day throughout. Each drop turns the ETH trend down
/// while the position is in profit.
fn cycles() -> HistoricalData {
    let mut eth = vec![2000.0];
    for day in 1..48 {
        let step = if (day - 1) % 12 < 8 { 10.0 } else { -30.0 };
        eth.push(eth[day - 1] + step);
    }
    data(series(eth), linear(2050.0, 30.0, 48), linear(30.0, 0.0, 48))
}

fn run(data: HistoricalData) -> Vec<StrategyStep> {
    run_with(data, StrategyPolicy::default())
}

fn run_with(data: HistoricalData, policy: StrategyPolicy) -> Vec<StrategyStep> {
    simulate_strategy(&SimulationParams::new(CAPITAL, data), &policy).unwrap()
}

fn of_type(steps: &[StrategyStep], step_type: StepType) -> Vec<&StrategyStep> {
    steps.iter().filter(|s| s.step_type == step_type).collect()
}

#[test]
fn test_empty_series_fail_fast_in_order() {
    let full = rising();
    let cases = [
        (data(vec![], vec![], vec![]), SimulationError::NoEthPriceData),
        (
            data(full.eth_prices.clone(), vec![], vec![]),
            SimulationError::NoWstEthPriceData,
        ),
        (
            data(full.eth_prices.clone(), full.wsteth_prices.clone(), vec![]),
            SimulationError::NoGasPriceData,
        ),
    ];
    for (input, expected) in cases {
        let err = simulate_strategy(
            &SimulationParams::new(CAPITAL, input),
            &StrategyPolicy::default(),
        )
        .unwrap_err();
        assert_eq!(err, expected);
    }
}

#[test]
fn test_ledger_starts_with_initialize_and_ends_with_complete() {
    for scenario in [rising(), crash(), orderly_decline()] {
        let steps = run(scenario);
        assert_eq!(steps[0].task, INITIALIZE_STRATEGY);
        assert_eq!(steps[0].step_type, StepType::Enter);
        assert_eq!(steps[0].loop_no, 0);
        assert_eq!(steps.last().unwrap().task, STRATEGY_COMPLETE);
    }
}

#[test]
fn test_health_factor_matches_balances() {
    for scenario in [rising(), crash(), orderly_decline()] {
        for step in run(scenario) {
            let b = step.balances;
            if b.borrowed_eth == 0.0 {
                assert_eq!(step.health_factor, f64::INFINITY, "{}", step.task);
            } else {
                let expected =
                    b.wsteth * step.wsteth_price * 0.825 / (b.borrowed_eth * step.eth_price);
                assert!(
                    (step.health_factor - expected).abs() < 1e-9,
                    "{}: {} != {}",
                    step.task,
                    step.health_factor,
                    expected
                );
            }
        }
    }
}

#[test]
fn test_total_value_identity() {
    for scenario in [rising(), crash(), orderly_decline()] {
        for step in run(scenario) {
            let b = step.balances;
            let expected = b.eth * step.eth_price + b.wsteth * step.wsteth_price
                - b.borrowed_eth * step.eth_price;
            let reported = parse_usd(&step.details.total_value_usd).unwrap();
            assert!(
                (reported - expected).abs() <= 0.005 + 1e-9,
                "{}: {} vs {}",
                step.task,
                reported,
                expected
            );
        }
    }
}

#[test]
fn test_rising_market_borrows() {
    let steps = run(rising());
    assert!(steps
        .iter()
        .any(|s| s.step_type == StepType::Borrow && s.balances.borrowed_eth > 0.0));
}

#[test]
fn test_crash_exits_with_documented_reason() {
    let steps = run(crash());
    let exit = steps
        .iter()
        .find(|s| s.step_type == StepType::Exit && s.task != STRATEGY_COMPLETE)
        .expect("no exit in crash scenario");
    let reason = exit.reason.as_deref().unwrap();
    assert!(EXIT_REASONS.contains(&reason), "unexpected reason {}", reason);
    assert_eq!(exit.balances.borrowed_eth, 0.0);
}

#[test]
fn test_orderly_decline_keeps_health_factor_above_floor() {
    let steps = run(orderly_decline());
    for step in &steps {
        if step.health_factor.is_finite() {
            assert!(step.health_factor > 1.1, "{}: {}", step.date, step.health_factor);
        }
    }
    assert!(steps.iter().any(|s| s.step_type == StepType::Exit && s.task != STRATEGY_COMPLETE));
}

#[test]
fn test_analyzer_and_risk_engine_are_deterministic() {
    let policy = StrategyPolicy::default();
    let analyzer = MarketAnalyzer::new(policy);
    let risk = RiskEngine::new(policy);
    let history = crash();

    for day in 0..10 {
        let at = Timestamp::new(T0 + day * SECONDS_PER_DAY);
        let first = analyzer.analyze(&history, at);
        assert_eq!(first, analyzer.analyze(&history, at));
        assert_eq!(
            risk.should_exit_loop(1.3, &first, -2.0),
            risk.should_exit_loop(1.3, &first, -2.0)
        );
    }

    let mc = MarketConditions {
        is_favorable: true,
        volatility: 0.02,
        price_trend: PriceTrend::Up,
        profit_potential: 4.0,
        gas_conditions: GasConditions::Low,
    };
    assert_eq!(
        risk.calculate_optimal_borrow_amount(10_000.0, 2000.0, 0.02),
        risk.calculate_optimal_borrow_amount(10_000.0, 2000.0, 0.02)
    );
    assert_eq!(risk.should_enter_loop(&mc, 0.0), risk.should_enter_loop(&mc, 0.0));
    assert_eq!(risk.assess_risk(1.0, 0.02, 1.5), risk.assess_risk(1.0, 0.02, 1.5));
}

#[test]
fn test_whole_run_is_deterministic() {
    assert_eq!(run(crash()), run(crash()));
}

#[test]
fn test_reentry_step_precedes_each_later_loop() {
    for rule in [ReentryRule::EntryConditions, ReentryRule::Dedicated] {
        let steps = run_with(
            cycles(),
            StrategyPolicy {
                reentry_rule: rule,
                ..StrategyPolicy::default()
            },
        );
        let swaps = of_type(&steps, StepType::Swap);
        assert!(swaps.len() > 1, "{:?} never re-entered", rule);

        for (i, step) in steps.iter().enumerate() {
            if step.step_type != StepType::Swap {
                continue;
            }
            let n = step.loop_no;
            assert_eq!(step.task, format!("Swap ETH to wstETH - Loop {}", n));
            if n == 1 {
                continue;
            }
            let prev = &steps[i - 1];
            assert_eq!(prev.step_type, StepType::Reenter, "{:?} loop {}", rule, n);
            assert_eq!(prev.loop_no, n);
            assert_eq!(prev.task, format!("Re-enter Position - Loop {}", n));
            assert!(prev
                .reason
                .as_deref()
                .unwrap()
                .starts_with("Conditions favorable after exit at "));
        }

        let loop_numbers: Vec<u32> = swaps.iter().map(|s| s.loop_no).collect();
        let expected: Vec<u32> = (1..=swaps.len() as u32).collect();
        assert_eq!(loop_numbers, expected);
        assert_eq!(of_type(&steps, StepType::Reenter).len(), swaps.len() - 1);
    }
}

#[test]
fn test_loop_ceiling_caps_swaps() {
    let with_ceiling = |max_loops| {
        run_with(
            cycles(),
            StrategyPolicy {
                max_loops,
                ..StrategyPolicy::default()
            },
        )
    };

    let single = with_ceiling(1);
    assert_eq!(of_type(&single, StepType::Swap).len(), 1);
    assert!(of_type(&single, StepType::Reenter).is_empty());

    assert_eq!(of_type(&with_ceiling(3), StepType::Swap).len(), 3);

    let default = run(cycles());
    let swaps = of_type(&default, StepType::Swap).len();
    assert_eq!(swaps, 5);
    assert!(default.iter().all(|s| s.loop_no <= 5));
}

#[test]
fn test_dedicated_rule_reenters_no_earlier() {
    let entry_dates = |rule| -> Vec<String> {
        let steps = run_with(
            cycles(),
            StrategyPolicy {
                reentry_rule: rule,
                ..StrategyPolicy::default()
            },
        );
        of_type(&steps, StepType::Swap)
            .into_iter()
            .map(|s| s.date.clone())
            .collect()
    };

    let loose = entry_dates(ReentryRule::EntryConditions);
    let dedicated = entry_dates(ReentryRule::Dedicated);
    assert_eq!(loose[1], "2023-01-13");
    assert_eq!(dedicated[1], "2023-01-17");
    assert!(dedicated.len() <= loose.len());
    for (d, l) in dedicated.iter().zip(&loose) {
        assert!(d >= l, "dedicated entry {} before {}", d, l);
    }
}
