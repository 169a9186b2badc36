use crate::domain::Balances;

/// Valuation of a position at one set of prices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionMetrics {
    pub total_value_usd: f64,
    pub borrow_value_usd: f64,
    pub collateral_value_usd: f64,
    pub profit_loss_usd: f64,
    pub profit_loss_pct: f64,
}

/// Live state of one simulation run. Mutated only by the transitions below.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PositionState {
    pub eth_balance: f64,
    pub wsteth_balance: f64,
    pub borrowed_eth: f64,
    /// Number of loops opened so far.
    pub loop_count: u32,
    pub in_position: bool,
    /// P&L percent recorded at the most recent exit.
    pub last_exit_profit_pct: f64,
}

impl PositionState {
    /// Start flat, holding `initial_capital` worth of ETH.
    pub fn funded(initial_capital: f64, eth_price: f64) -> Self {
        Self {
            eth_balance: if eth_price > 0.0 {
                initial_capital / eth_price
            } else {
                0.0
            },
            ..Self::default()
        }
    }

    pub fn balances(&self) -> Balances {
        Balances {
            eth: self.eth_balance,
            wsteth: self.wsteth_balance,
            borrowed_eth: self.borrowed_eth,
        }
    }

    pub fn metrics(&self, eth_price: f64, wsteth_price: f64, initial_capital: f64) -> PositionMetrics {
        valuate(&self.balances(), eth_price, wsteth_price, initial_capital)
    }

    /// Open a new loop: bump the counter and convert all ETH to wstETH.
    ///
    /// Returns the amount of ETH swapped.
    pub fn open_loop(&mut self, eth_price: f64, wsteth_price: f64) -> f64 {
        self.loop_count += 1;
        let swapped = self.eth_balance;
        self.eth_balance = 0.0;
        if wsteth_price > 0.0 {
            self.wsteth_balance += swapped * eth_price / wsteth_price;
        }
        swapped
    }

    /// Borrow ETH against the wstETH collateral.
    pub fn borrow(&mut self, amount: f64) {
        self.eth_balance += amount;
        self.borrowed_eth += amount;
        self.in_position = true;
    }

    /// Repay debt from the ETH balance (capped at what is held) and, once the
    /// loan is fully repaid, convert the remaining wstETH back to ETH.
    ///
    /// Returns the amount repaid.
    pub fn repay_and_unwind(&mut self, eth_price: f64, wsteth_price: f64, exit_profit_pct: f64) -> f64 {
        let repayment = self.eth_balance.min(self.borrowed_eth);
        self.eth_balance -= repayment;
        self.borrowed_eth -= repayment;

        if self.borrowed_eth == 0.0 && self.wsteth_balance > 0.0 && eth_price > 0.0 {
            self.eth_balance += self.wsteth_balance * wsteth_price / eth_price;
            self.wsteth_balance = 0.0;
        }

        self.last_exit_profit_pct = exit_profit_pct;
        self.in_position = false;
        repayment
    }
}

/// `total = eth*ethPx + wst*wstPx - borrowed*ethPx`; P&L against `initial_capital`.
pub fn valuate(
    balances: &Balances,
    eth_price: f64,
    wsteth_price: f64,
    initial_capital: f64,
) -> PositionMetrics {
    let collateral_value_usd = balances.wsteth * wsteth_price;
    let borrow_value_usd = balances.borrowed_eth * eth_price;
    let total_value_usd = balances.eth * eth_price + collateral_value_usd - borrow_value_usd;
    let profit_loss_usd = total_value_usd - initial_capital;
    let profit_loss_pct = if initial_capital != 0.0 {
        profit_loss_usd / initial_capital * 100.0
    } else {
        0.0
    };

    PositionMetrics {
        total_value_usd,
        borrow_value_usd,
        collateral_value_usd,
        profit_loss_usd,
        profit_loss_pct,
    }
}
