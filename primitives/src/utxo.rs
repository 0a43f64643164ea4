use crate::error::{SwapError, SwapResult};
use bitcoin::OutPoint;

/// Output-type-specific size/dust constants used for fee estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    P2tr,
    P2wpkh,
}

impl AddressKind {
    pub fn input_vbytes(&self) -> f64 {
        match self {
            AddressKind::P2tr => 58.0,
            AddressKind::P2wpkh => 68.0,
        }
    }

    pub fn output_vbytes(&self) -> f64 {
        match self {
            AddressKind::P2tr => 43.0,
            AddressKind::P2wpkh => 31.0,
        }
    }

    pub fn dust_limit(&self) -> u64 {
        match self {
            AddressKind::P2tr => 330,
            AddressKind::P2wpkh => 294,
        }
    }
}

pub const TX_OVERHEAD_VBYTES: f64 = 10.5;
pub const MIN_FEE_SAT: u64 = 1000;

#[derive(Debug, Clone)]
pub struct CandidateUtxo {
    pub outpoint: OutPoint,
    pub value_sat: u64,
    pub script_hex: String,
}

#[derive(Debug, Clone)]
pub struct CoinSelection {
    pub selected: Vec<CandidateUtxo>,
    pub fee_sat: u64,
    pub change_sat: u64,
}

/// Estimates the fee, in sats, for a transaction with `input_count` inputs of
/// `kind` and `output_count` outputs of `kind`, at `fee_rate` sat/vB.
pub fn estimate_fee(kind: AddressKind, input_count: usize, output_count: usize, fee_rate: f64) -> u64 {
    let vbytes = TX_OVERHEAD_VBYTES
        + kind.input_vbytes() * input_count as f64
        + kind.output_vbytes() * output_count as f64;
    let fee = (fee_rate * vbytes).ceil() as u64;
    fee.max(MIN_FEE_SAT)
}

/// Greedy largest-first coin selection: sorts candidates descending by
/// value and accumulates until `sum >= target + fee(selected_count)`.
/// A change output is only retained when `change >= dust_limit`; smaller
/// remainders are folded into the fee rather than rejected.
pub fn select_utxos(
    mut candidates: Vec<CandidateUtxo>,
    target_sat: u64,
    fee_rate: f64,
    kind: AddressKind,
) -> SwapResult<CoinSelection> {
    if candidates.is_empty() {
        return Err(SwapError::NoUtxos("no candidate utxos supplied".into()));
    }

    candidates.sort_by(|a, b| b.value_sat.cmp(&a.value_sat));

    let mut selected = Vec::new();
    let mut sum = 0u64;

    for candidate in candidates {
        selected.push(candidate);
        sum += selected.last().unwrap().value_sat;

        // Try both with and without a change output; take whichever is
        // actually affordable at this selection size.
        let fee_with_change = estimate_fee(kind, selected.len(), 2, fee_rate);
        let fee_without_change = estimate_fee(kind, selected.len(), 1, fee_rate);

        if sum >= target_sat + fee_with_change {
            let change = sum - target_sat - fee_with_change;
            if change >= kind.dust_limit() {
                return Ok(CoinSelection {
                    selected,
                    fee_sat: fee_with_change,
                    change_sat: change,
                });
            }
        }
        if sum >= target_sat + fee_without_change {
            return Ok(CoinSelection {
                selected,
                fee_sat: sum - target_sat,
                change_sat: 0,
            });
        }
    }

    Err(SwapError::FundsUnavailable(format!(
        "insufficient funds: needed at least {} sat plus fees",
        target_sat
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utxo(value: u64) -> CandidateUtxo {
        CandidateUtxo {
            outpoint: OutPoint::null(),
            value_sat: value,
            script_hex: String::new(),
        }
    }

    #[test]
    fn selects_largest_first_and_covers_fee() {
        let candidates = vec![utxo(1_000), utxo(100_000), utxo(5_000)];
        let selection = select_utxos(candidates, 50_000, 5.0, AddressKind::P2tr).unwrap();
        assert_eq!(selection.selected.len(), 1);
        assert_eq!(selection.selected[0].value_sat, 100_000);
        assert!(selection.fee_sat >= crate::utxo::MIN_FEE_SAT);
    }

    #[test]
    fn insufficient_funds_raises_funds_unavailable() {
        let candidates = vec![utxo(1_000), utxo(500)];
        let err = select_utxos(candidates, 50_000, 5.0, AddressKind::P2tr).unwrap_err();
        assert!(matches!(err, SwapError::FundsUnavailable(_)));
    }

    #[test]
    fn change_is_zero_or_above_dust() {
        let candidates = vec![utxo(1_000_000)];
        let selection = select_utxos(candidates, 50_000, 1.0, AddressKind::P2tr).unwrap();
        assert!(selection.change_sat == 0 || selection.change_sat >= AddressKind::P2tr.dust_limit());
    }
}
