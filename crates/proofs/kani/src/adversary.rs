//! Adversarial step generator over the tranche ledgers

#[cfg(kani)]
use kani::any;
use tranche_engine::{AccountId, Phase, Tranche, TrancheLedger};

#[cfg(kani)]
use crate::generators::any_holder;
#[cfg(kani)]
use crate::sanitizer::MAX_AMOUNT;

/// Non-burning ledger operations a holder can attempt at any time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Split,
    Transfer,
    Approve,
    TransferFrom,
}

#[cfg(kani)]
impl kani::Arbitrary for Step {
    fn any() -> Self {
        let choice: u8 = any();
        match choice % 4 {
            0 => Step::Split,
            1 => Step::Transfer,
            2 => Step::Approve,
            _ => Step::TransferFrom,
        }
    }
}

/// Apply `step`; returns principal newly split (0 unless a split succeeded)
pub fn apply_step(
    ledger: &mut TrancheLedger,
    step: Step,
    tranche: Tranche,
    from: AccountId,
    to: AccountId,
    amount: u128,
) -> u128 {
    match step {
        Step::Split => match ledger.split(from, amount, Phase::Issuance) {
            Ok(receipt) => receipt.senior_minted,
            Err(_) => 0,
        },
        Step::Transfer => {
            let _ = ledger.transfer(tranche, from, to, amount);
            0
        }
        Step::Approve => {
            ledger.approve(tranche, from, to, amount);
            0
        }
        Step::TransferFrom => {
            let _ = ledger.transfer_from(tranche, to, from, to, amount);
            0
        }
    }
}

#[cfg(kani)]
pub fn adversary_step(ledger: &mut TrancheLedger, holders: &[AccountId]) -> u128 {
    if holders.is_empty() {
        return 0;
    }
    let tranche = if any::<bool>() {
        Tranche::Senior
    } else {
        Tranche::Junior
    };
    let from = any_holder(holders);
    let to = any_holder(holders);
    let amount = (any::<u32>() as u128) % (MAX_AMOUNT + 1);
    apply_step(ledger, any::<Step>(), tranche, from, to, amount)
}
