//! Fitness evaluation of decision networks.
//!
//! A genome's fitness is the mean shaped reward over four short trials that cover both
//! sides of the table and both initial serve directions:
//!
//! | # | Controlled side | First serve toward |
//! |---|-----------------|--------------------|
//! | 1 | right           | right              |
//! | 2 | right           | left               |
//! | 3 | left            | right              |
//! | 4 | left            | left               |
//!
//! The opponent plays the other side. By default it is a [`HeuristicController`] whose lag
//! and aiming error are drawn afresh for every trial; during co-evolution it is the frozen
//! champion of the other population.
//!
//! # Example
//!
//! ```
//! use rally_engine::{CancelToken, PhysicsConfig};
//! use rally_evaluator::{
//!     FeedForwardNetwork, FitnessConfig, FitnessEvaluator, NetworkLayout, Opponent,
//! };
//! use rand::SeedableRng as _;
//!
//! let layout = NetworkLayout::CURRENT;
//! let shape = layout.shape(4);
//! let network = FeedForwardNetwork::new(shape, vec![0.0; shape.param_count()])?;
//!
//! let evaluator = FitnessEvaluator::new(
//!     PhysicsConfig::default(),
//!     FitnessConfig::default(),
//!     layout,
//!     Opponent::RandomHeuristic,
//! );
//! let mut rng = rand_pcg::Pcg32::seed_from_u64(1);
//! let fitness = evaluator.evaluate(&network, &mut rng, &CancelToken::new())?;
//! assert!(fitness.is_finite());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use rally_engine::{
    CancelToken, Cancelled, Controller, GameState, MatchSession, Motion, PhysicsConfig, Side,
    TickResult,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    controller::{HeuristicController, HeuristicParams, NetworkController},
    decision_network::{DecisionFunction, NetworkError, NetworkLayout},
    shaping::ShapingConfig,
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum EvaluationError {
    #[display("evaluation cancelled")]
    Cancelled(Cancelled),
    #[display("network cannot be evaluated")]
    Network(NetworkError),
}

impl EvaluationError {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Closed range a random parameter is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    #[must_use]
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Uniform sample; a degenerate or inverted range yields `min`.
    pub fn sample<R>(&self, rng: &mut R) -> f32
    where
        R: Rng + ?Sized,
    {
        if self.max > self.min {
            rng.random_range(self.min..=self.max)
        } else {
            self.min
        }
    }
}

/// How long a single trial lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialBudget {
    /// Fixed amount of simulated time, run as fast as possible.
    ///
    /// The trial always plays the same number of ticks, so seeded evaluations are exactly
    /// reproducible.
    Simulated(Duration),
    /// Fixed amount of real time, paced at the configured tick rate.
    WallClock(Duration),
}

impl Default for TrialBudget {
    fn default() -> Self {
        Self::Simulated(Duration::from_secs(5))
    }
}

impl TrialBudget {
    #[must_use]
    pub fn duration(&self) -> Duration {
        match self {
            Self::Simulated(d) | Self::WallClock(d) => *d,
        }
    }

    /// Number of ticks a simulated trial plays at `tick_rate`.
    #[must_use]
    pub fn simulated_ticks(&self, tick_rate: u32) -> u64 {
        let ticks = self.duration().as_secs_f64() * f64::from(tick_rate);
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ticks = ticks.round() as u64;
        ticks.max(1)
    }
}

enum TrialClock {
    Simulated { remaining: u64 },
    WallClock {
        start: Instant,
        budget: Duration,
        period: Duration,
        next: Instant,
    },
}

impl TrialClock {
    fn start(budget: TrialBudget, tick_rate: u32) -> Self {
        match budget {
            TrialBudget::Simulated(_) => Self::Simulated {
                remaining: budget.simulated_ticks(tick_rate),
            },
            TrialBudget::WallClock(duration) => {
                let now = Instant::now();
                let period = Duration::from_secs(1) / tick_rate.max(1);
                Self::WallClock {
                    start: now,
                    budget: duration,
                    period,
                    next: now + period,
                }
            }
        }
    }

    /// Waits for the next tick slot; `false` once the budget is spent.
    fn advance(&mut self) -> bool {
        match self {
            Self::Simulated { remaining } => {
                if *remaining == 0 {
                    return false;
                }
                *remaining -= 1;
                true
            }
            Self::WallClock {
                start,
                budget,
                period,
                next,
            } => {
                if start.elapsed() > *budget {
                    return false;
                }
                let now = Instant::now();
                if *next > now {
                    thread::sleep(*next - now);
                }
                *next += *period;
                true
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessConfig {
    /// Simulation steps per second; every tick advances `1 / tick_rate` seconds.
    pub tick_rate: u32,
    pub trial_budget: TrialBudget,
    pub shaping: ShapingConfig,
    /// Lag of the randomized heuristic opponent.
    pub opponent_lag: ParamRange,
    /// Aiming error of the randomized heuristic opponent.
    pub opponent_error: ParamRange,
    /// Dead zone of heuristic controllers.
    pub heuristic_dead_zone: f32,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            tick_rate: 240,
            trial_budget: TrialBudget::default(),
            shaping: ShapingConfig::default(),
            opponent_lag: ParamRange::new(0.15, 0.35),
            opponent_error: ParamRange::new(6.0, 14.0),
            heuristic_dead_zone: 8.0,
        }
    }
}

impl FitnessConfig {
    /// Seconds advanced per tick.
    #[must_use]
    pub fn dt(&self) -> f32 {
        #[expect(clippy::cast_precision_loss)]
        let rate = self.tick_rate.max(1) as f32;
        1.0 / rate
    }
}

/// Controlled side and first serve direction of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSetup {
    pub controlled: Side,
    pub serve: Side,
}

impl TrialSetup {
    /// The four trials, in evaluation order.
    pub const ALL: [Self; 4] = [
        Self {
            controlled: Side::Right,
            serve: Side::Right,
        },
        Self {
            controlled: Side::Right,
            serve: Side::Left,
        },
        Self {
            controlled: Side::Left,
            serve: Side::Right,
        },
        Self {
            controlled: Side::Left,
            serve: Side::Left,
        },
    ];
}

/// Outcome of a single trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialReport {
    pub setup: TrialSetup,
    pub reward: f32,
    pub ticks: u64,
    pub points_for: usize,
    pub points_against: usize,
    /// Hits by the controlled paddle.
    pub hits: usize,
    /// Parameters of the heuristic opponent, if one was used.
    pub opponent: Option<HeuristicParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitnessReport {
    pub trials: Vec<TrialReport>,
    /// Mean trial reward.
    pub fitness: f32,
}

impl FitnessReport {
    fn from_trials(trials: Vec<TrialReport>) -> Self {
        let total: f32 = trials.iter().map(|t| t.reward).sum();
        #[expect(clippy::cast_precision_loss)]
        let fitness = total / trials.len().max(1) as f32;
        Self { trials, fitness }
    }
}

/// Receives every tick of a trial, e.g. to render it.
pub trait TrialObserver {
    fn on_tick(
        &mut self,
        setup: TrialSetup,
        session: &MatchSession,
        tick: &TickResult,
        reward: f32,
    );

    fn on_trial_end(&mut self, _report: &TrialReport) {}
}

impl TrialObserver for () {
    fn on_tick(&mut self, _: TrialSetup, _: &MatchSession, _: &TickResult, _: f32) {}
}

/// The side opposing the evaluated network.
#[derive(Debug, Clone)]
pub enum Opponent {
    /// A heuristic with lag and error drawn per trial from the [`FitnessConfig`] ranges.
    RandomHeuristic,
    /// A fixed network, such as the other population's champion.
    Frozen {
        network: Arc<dyn DecisionFunction>,
        layout: NetworkLayout,
    },
}

impl Opponent {
    /// Frozen opponent, checked against `layout`.
    pub fn frozen(
        network: Arc<dyn DecisionFunction>,
        layout: NetworkLayout,
    ) -> Result<Self, NetworkError> {
        layout.check(&*network)?;
        Ok(Self::Frozen { network, layout })
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(self, Self::Frozen { .. })
    }
}

enum OpponentController<'a> {
    Heuristic(HeuristicController),
    Network(NetworkController<'a>),
}

impl Controller for OpponentController<'_> {
    fn decide(&mut self, state: &GameState) -> Motion {
        match self {
            Self::Heuristic(c) => c.decide(state),
            Self::Network(c) => c.decide(state),
        }
    }
}

/// Scores decision networks by playing them against an [`Opponent`].
///
/// The evaluator is immutable and shareable across threads; all per-evaluation state
/// lives on the stack of [`Self::evaluate`].
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    physics: PhysicsConfig,
    config: FitnessConfig,
    layout: NetworkLayout,
    opponent: Opponent,
}

impl FitnessEvaluator {
    /// `layout` applies to the networks being evaluated; a frozen opponent carries its own.
    #[must_use]
    pub fn new(
        physics: PhysicsConfig,
        config: FitnessConfig,
        layout: NetworkLayout,
        opponent: Opponent,
    ) -> Self {
        Self {
            physics,
            config,
            layout,
            opponent,
        }
    }

    #[must_use]
    pub fn physics(&self) -> &PhysicsConfig {
        &self.physics
    }

    #[must_use]
    pub fn config(&self) -> &FitnessConfig {
        &self.config
    }

    #[must_use]
    pub fn layout(&self) -> NetworkLayout {
        self.layout
    }

    #[must_use]
    pub fn opponent(&self) -> &Opponent {
        &self.opponent
    }

    /// Mean shaped reward of `network` over the four trials.
    ///
    /// Every random draw comes from `rng`. `cancel` is checked before every tick.
    pub fn evaluate<R>(
        &self,
        network: &dyn DecisionFunction,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<f32, EvaluationError>
    where
        R: Rng + ?Sized,
    {
        self.evaluate_detailed(network, rng, cancel)
            .map(|report| report.fitness)
    }

    /// Like [`Self::evaluate`], with the per-trial breakdown.
    pub fn evaluate_detailed<R>(
        &self,
        network: &dyn DecisionFunction,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<FitnessReport, EvaluationError>
    where
        R: Rng + ?Sized,
    {
        self.evaluate_observed(network, rng, cancel, &mut ())
    }

    /// Like [`Self::evaluate_detailed`], reporting every tick to `observer`.
    pub fn evaluate_observed<R, O>(
        &self,
        network: &dyn DecisionFunction,
        rng: &mut R,
        cancel: &CancelToken,
        observer: &mut O,
    ) -> Result<FitnessReport, EvaluationError>
    where
        R: Rng + ?Sized,
        O: TrialObserver + ?Sized,
    {
        self.layout.check(network)?;
        let trials = TrialSetup::ALL
            .into_iter()
            .map(|setup| self.run_trial(setup, network, rng, cancel, observer))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FitnessReport::from_trials(trials))
    }

    fn opponent_controller<R>(
        &self,
        side: Side,
        rng: &mut R,
    ) -> Result<(OpponentController<'_>, Option<HeuristicParams>), NetworkError>
    where
        R: Rng + ?Sized,
    {
        match &self.opponent {
            Opponent::RandomHeuristic => {
                let params = HeuristicParams {
                    lag: self.config.opponent_lag.sample(rng),
                    error: self.config.opponent_error.sample(rng),
                };
                let controller = HeuristicController::new(
                    side,
                    params,
                    self.config.heuristic_dead_zone,
                    rng.random(),
                );
                Ok((OpponentController::Heuristic(controller), Some(params)))
            }
            Opponent::Frozen { network, layout } => {
                let controller = NetworkController::new(side, &**network, *layout, &self.physics)?;
                Ok((OpponentController::Network(controller), None))
            }
        }
    }

    fn run_trial<R, O>(
        &self,
        setup: TrialSetup,
        network: &dyn DecisionFunction,
        rng: &mut R,
        cancel: &CancelToken,
        observer: &mut O,
    ) -> Result<TrialReport, EvaluationError>
    where
        R: Rng + ?Sized,
        O: TrialObserver + ?Sized,
    {
        let controlled = setup.controlled;
        let mut session = MatchSession::with_seed(&self.physics, rng.random());
        session.serve(setup.serve);

        let mut agent = NetworkController::new(controlled, network, self.layout, &self.physics)?;
        let (mut opponent, opponent_params) =
            self.opponent_controller(controlled.opponent(), rng)?;

        let dt = self.config.dt();
        let mut clock = TrialClock::start(self.config.trial_budget, self.config.tick_rate);
        let mut reward = 0.0;
        while clock.advance() {
            let tick = match controlled {
                Side::Left => session.tick_checked(dt, cancel, &mut agent, &mut opponent)?,
                Side::Right => session.tick_checked(dt, cancel, &mut opponent, &mut agent)?,
            };
            let tick_reward = self.config.shaping.tick_reward(controlled, &tick, &session);
            reward += tick_reward;
            if let Some(scorer) = tick.scorer {
                trace!(?setup, %scorer, reward, "point");
            }
            observer.on_tick(setup, &session, &tick, tick_reward);
        }

        let stats = session.stats();
        let report = TrialReport {
            setup,
            reward,
            ticks: session.ticks(),
            points_for: stats.points(controlled),
            points_against: stats.points(controlled.opponent()),
            hits: stats.hits(controlled),
            opponent: opponent_params,
        };
        trace!(
            ?setup,
            reward,
            points_for = report.points_for,
            points_against = report.points_against,
            hits = report.hits,
            "trial finished"
        );
        observer.on_trial_end(&report);
        Ok(report)
    }
}
