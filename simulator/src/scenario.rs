//! Simulation scenarios.

use rand::Rng;
use serde::{Deserialize, Serialize};

use sealbid_common::{Amount, Phase};

/// A simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Steps in the scenario.
    pub steps: Vec<ScenarioStep>,
}

/// Expected outcome of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Expect {
    #[default]
    Success,
    /// Rejected with this error code.
    Error(String),
}

impl Expect {
    fn error(code: &str) -> Self {
        Expect::Error(code.to_string())
    }
}

/// A step in a scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStep {
    /// Move the simulated clock forward.
    Advance { seconds: i64 },
    /// Jump the simulated clock to the first instant of `phase`.
    EnterPhase { phase: Phase },
    /// Open bidding.
    Start { caller: String, expect: Expect },
    /// Fund a bidder with `deposit` and commit a sealed bid of `value`.
    ///
    /// With `reuse_digest_of`, the bidder submits another bidder's digest
    /// instead of their own.
    Commit {
        bidder: String,
        value: Amount,
        deposit: Amount,
        reuse_digest_of: Option<String>,
        expect: Expect,
    },
    /// Reveal the bidder's sealed bid, optionally lying about the value.
    Reveal {
        bidder: String,
        claimed_value: Option<Amount>,
        expect: Expect,
    },
    /// Withdraw a deposit.
    Withdraw { bidder: String, expect: Expect },
    /// Claim the lot.
    Claim { bidder: String, expect: Expect },
    /// Seller collects the winning bid.
    CollectProceeds { expect: Expect },
    /// Seller takes back an unsold lot.
    ReclaimLot { expect: Expect },
    /// Assert a condition.
    Assert { condition: AssertCondition },
}

/// Conditions that can be asserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AssertCondition {
    /// Effective phase equals.
    PhaseIs { phase: Phase },
    /// Leading bid equals.
    HighestBid {
        bidder: Option<String>,
        value: Amount,
    },
    /// Escrow balance equals.
    EscrowEquals { amount: Amount },
    /// Lot token balance of an account equals.
    LotBalanceEquals { account: String, amount: Amount },
}

impl Scenario {
    /// Load a built-in scenario by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "reference" => Ok(Self::reference()),
            "unsold" => Ok(Self::unsold()),
            _ => Err(anyhow::anyhow!("Unknown scenario: {}", name)),
        }
    }

    /// Load a scenario from a JSON file.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Five bidders, four honest bids of 150..180 and one bidder that reuses
    /// another's digest.
    fn reference() -> Self {
        let honest = [("bidder_1", 150), ("bidder_2", 160), ("bidder_3", 170), ("bidder_4", 180)];

        let mut steps = vec![
            ScenarioStep::Start {
                caller: "outsider".to_string(),
                expect: Expect::error("NOT_SELLER"),
            },
            ScenarioStep::Start {
                caller: "seller".to_string(),
                expect: Expect::Success,
            },
            ScenarioStep::Commit {
                bidder: "bidder_1".to_string(),
                value: 150,
                deposit: 50,
                reuse_digest_of: None,
                expect: Expect::error("BELOW_RESERVE"),
            },
        ];

        for (bidder, value) in honest {
            steps.push(ScenarioStep::Commit {
                bidder: bidder.to_string(),
                value,
                deposit: 200,
                reuse_digest_of: None,
                expect: Expect::Success,
            });
        }

        steps.extend([
            ScenarioStep::Commit {
                bidder: "bidder_5".to_string(),
                value: 250,
                deposit: 250,
                reuse_digest_of: Some("bidder_4".to_string()),
                expect: Expect::Success,
            },
            ScenarioStep::Commit {
                bidder: "bidder_1".to_string(),
                value: 150,
                deposit: 200,
                reuse_digest_of: None,
                expect: Expect::error("ALREADY_COMMITTED"),
            },
            ScenarioStep::Assert {
                condition: AssertCondition::EscrowEquals { amount: 1050 },
            },
            ScenarioStep::EnterPhase {
                phase: Phase::Revealing,
            },
            ScenarioStep::Assert {
                condition: AssertCondition::PhaseIs {
                    phase: Phase::Revealing,
                },
            },
            ScenarioStep::Reveal {
                bidder: "bidder_1".to_string(),
                claimed_value: Some(600),
                expect: Expect::error("HASH_MISMATCH"),
            },
            ScenarioStep::Reveal {
                bidder: "bidder_6".to_string(),
                claimed_value: Some(200),
                expect: Expect::error("NO_COMMITMENT"),
            },
            ScenarioStep::Reveal {
                bidder: "bidder_5".to_string(),
                claimed_value: None,
                expect: Expect::error("HASH_MISMATCH"),
            },
        ]);

        for (bidder, _) in honest {
            steps.push(ScenarioStep::Reveal {
                bidder: bidder.to_string(),
                claimed_value: None,
                expect: Expect::Success,
            });
        }

        steps.extend([
            ScenarioStep::Assert {
                condition: AssertCondition::HighestBid {
                    bidder: Some("bidder_4".to_string()),
                    value: 180,
                },
            },
            ScenarioStep::Claim {
                bidder: "bidder_4".to_string(),
                expect: Expect::error("NOT_ENDED"),
            },
            ScenarioStep::EnterPhase { phase: Phase::Ended },
            ScenarioStep::Claim {
                bidder: "bidder_1".to_string(),
                expect: Expect::error("NOT_WINNER"),
            },
            ScenarioStep::Withdraw {
                bidder: "bidder_4".to_string(),
                expect: Expect::error("IS_WINNER"),
            },
        ]);

        for bidder in ["bidder_1", "bidder_2", "bidder_3", "bidder_5"] {
            steps.push(ScenarioStep::Withdraw {
                bidder: bidder.to_string(),
                expect: Expect::Success,
            });
        }

        steps.extend([
            ScenarioStep::Assert {
                condition: AssertCondition::EscrowEquals { amount: 200 },
            },
            ScenarioStep::Claim {
                bidder: "bidder_4".to_string(),
                expect: Expect::Success,
            },
            ScenarioStep::Assert {
                condition: AssertCondition::EscrowEquals { amount: 180 },
            },
            ScenarioStep::Assert {
                condition: AssertCondition::LotBalanceEquals {
                    account: "bidder_4".to_string(),
                    amount: 1000,
                },
            },
            ScenarioStep::Claim {
                bidder: "bidder_4".to_string(),
                expect: Expect::error("ALREADY_CLAIMED"),
            },
            ScenarioStep::CollectProceeds {
                expect: Expect::Success,
            },
            ScenarioStep::Assert {
                condition: AssertCondition::EscrowEquals { amount: 0 },
            },
        ]);

        Self {
            name: "reference".to_string(),
            description: "Four honest bidders and one forged digest".to_string(),
            steps,
        }
    }

    /// Nobody reveals, so the lot goes back to the seller.
    fn unsold() -> Self {
        let mut steps = vec![ScenarioStep::Start {
            caller: "seller".to_string(),
            expect: Expect::Success,
        }];

        for bidder in ["bidder_1", "bidder_2"] {
            steps.push(ScenarioStep::Commit {
                bidder: bidder.to_string(),
                value: 150,
                deposit: 200,
                reuse_digest_of: None,
                expect: Expect::Success,
            });
        }

        steps.extend([
            ScenarioStep::EnterPhase { phase: Phase::Ended },
            ScenarioStep::CollectProceeds {
                expect: Expect::error("NO_WINNER"),
            },
            ScenarioStep::ReclaimLot {
                expect: Expect::Success,
            },
            ScenarioStep::ReclaimLot {
                expect: Expect::error("ALREADY_CLAIMED"),
            },
            ScenarioStep::Withdraw {
                bidder: "bidder_1".to_string(),
                expect: Expect::Success,
            },
            ScenarioStep::Withdraw {
                bidder: "bidder_2".to_string(),
                expect: Expect::Success,
            },
            ScenarioStep::Assert {
                condition: AssertCondition::EscrowEquals { amount: 0 },
            },
        ]);

        Self {
            name: "unsold".to_string(),
            description: "No reveals; seller reclaims the lot".to_string(),
            steps,
        }
    }

    /// Random auction with `bidders` participants.
    ///
    /// Roughly one bidder in ten deposits less than their bid and one in
    /// eight never reveals. Expected outcomes are worked out up front.
    pub fn random<R: Rng>(rng: &mut R, bidders: usize, reserve: Amount) -> Self {
        struct Plan {
            name: String,
            value: Amount,
            deposit: Amount,
            reveals: bool,
        }

        let plans: Vec<Plan> = (0..bidders)
            .map(|i| {
                let value = rng.gen_range(reserve..=reserve * 3);
                let deposit = if rng.gen_bool(0.1) {
                    rng.gen_range(reserve..=value)
                } else {
                    value + rng.gen_range(0..=reserve)
                };
                Plan {
                    name: format!("bidder_{}", i + 1),
                    value,
                    deposit,
                    reveals: !rng.gen_bool(0.125),
                }
            })
            .collect();

        let mut steps = vec![ScenarioStep::Start {
            caller: "seller".to_string(),
            expect: Expect::Success,
        }];

        for plan in &plans {
            steps.push(ScenarioStep::Commit {
                bidder: plan.name.clone(),
                value: plan.value,
                deposit: plan.deposit,
                reuse_digest_of: None,
                expect: Expect::Success,
            });
        }

        steps.push(ScenarioStep::EnterPhase {
            phase: Phase::Revealing,
        });

        let mut leader: Option<(&str, Amount)> = None;
        for plan in plans.iter().filter(|p| p.reveals) {
            let expect = if plan.value > plan.deposit {
                Expect::error("INSUFFICIENT_DEPOSIT")
            } else {
                if leader.map_or(true, |(_, best)| plan.value > best) {
                    leader = Some((plan.name.as_str(), plan.value));
                }
                Expect::Success
            };
            steps.push(ScenarioStep::Reveal {
                bidder: plan.name.clone(),
                claimed_value: None,
                expect,
            });
        }

        steps.push(ScenarioStep::Assert {
            condition: AssertCondition::HighestBid {
                bidder: leader.map(|(name, _)| name.to_string()),
                value: leader.map_or(0, |(_, value)| value),
            },
        });
        steps.push(ScenarioStep::EnterPhase { phase: Phase::Ended });

        for plan in &plans {
            let step = match leader {
                Some((name, _)) if name == plan.name => ScenarioStep::Claim {
                    bidder: plan.name.clone(),
                    expect: Expect::Success,
                },
                _ => ScenarioStep::Withdraw {
                    bidder: plan.name.clone(),
                    expect: Expect::Success,
                },
            };
            steps.push(step);
        }

        steps.push(match leader {
            Some(_) => ScenarioStep::CollectProceeds {
                expect: Expect::Success,
            },
            None => ScenarioStep::ReclaimLot {
                expect: Expect::Success,
            },
        });
        steps.push(ScenarioStep::Assert {
            condition: AssertCondition::EscrowEquals { amount: 0 },
        });

        Self {
            name: "random".to_string(),
            description: format!("Random auction with {} bidders", bidders),
            steps,
        }
    }
}
