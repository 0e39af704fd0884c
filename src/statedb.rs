//! Execution state handed to the virtual machine.
//!
//! `StateDb` sits between a VM adapter and an account [`State`]. Balance, code,
//! storage and account deletion go straight to the store; refunds, logs,
//! preimages, self-destruct flags and the affected/created address sets are
//! kept in a [`Journal`]. A snapshot takes a store checkpoint and pushes a
//! journal layer at the same time, so the journal depth doubles as the revision
//! for both sides.

use crate::journal::{Journal, Revision};
use crate::state::State;
use crate::types::{Address, Amount, Bytes32, Log};
use std::collections::HashSet;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JournalKey {
    SuicideFlag(Address),
    Refund,
    Preimage(Bytes32),
    Log,
    AffectedAddress(Address),
    CreatedContract(Address),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalValue {
    Flag(bool),
    Refund(Amount),
    Preimage(Vec<u8>),
    Log(Log),
    /// Presence marker for address sets.
    Touched,
}

fn resolve_default(key: &JournalKey) -> Option<JournalValue> {
    match key {
        JournalKey::SuicideFlag(_) => Some(JournalValue::Flag(false)),
        JournalKey::Refund => Some(JournalValue::Refund(Amount::ZERO)),
        JournalKey::Preimage(_)
        | JournalKey::Log
        | JournalKey::AffectedAddress(_)
        | JournalKey::CreatedContract(_) => None,
    }
}

/// Everything an execution produced, gathered by [`StateDb::collect_outputs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outputs {
    pub logs: Vec<Log>,
    /// Unique, in order of first appearance.
    pub affected_addresses: Vec<Address>,
    /// Unique, in order of first appearance.
    pub created_contracts: Vec<Address>,
    pub preimages: Vec<(Bytes32, Vec<u8>)>,
}

pub struct StateDb<S: State> {
    state: S,
    journal: Journal<JournalKey, JournalValue>,
}

impl<S: State> StateDb<S> {
    pub fn new(state: S) -> Self {
        StateDb {
            state,
            journal: Journal::new(resolve_default),
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Hands the store back once execution is done.
    pub fn into_state(self) -> S {
        self.state
    }

    fn lookup(&self, key: &JournalKey) -> JournalValue {
        match self.journal.get(key) {
            Some(value) => value,
            None => panic!("no default value for journal key {:?}", key),
        }
    }

    // ---- balances ----

    pub fn get_balance(&self, addr: &Address) -> Amount {
        self.state.get_balance(addr)
    }

    pub fn add_balance(&mut self, addr: &Address, amount: Amount) {
        if amount == Amount::ZERO {
            return;
        }
        self.journal
            .put(JournalKey::AffectedAddress(*addr), JournalValue::Touched);
        let balance = self.state.get_balance(addr);
        self.state.set_balance(addr, balance.saturating_add(amount));
    }

    /// Callers check funds first; an overdraft leaves the balance at zero.
    pub fn sub_balance(&mut self, addr: &Address, amount: Amount) {
        if amount == Amount::ZERO {
            return;
        }
        self.journal
            .put(JournalKey::AffectedAddress(*addr), JournalValue::Touched);
        let balance = self.state.get_balance(addr);
        if balance < amount {
            warn!(%addr, %balance, %amount, "balance underflow, clamping to zero");
        }
        self.state.set_balance(addr, balance.saturating_sub(amount));
    }

    // ---- accounts ----

    /// Accounts come into existence on first write; nothing to do here.
    pub fn create_account(&mut self, _addr: &Address) {}

    /// Nonces are not tracked by this ledger.
    pub fn get_nonce(&self, _addr: &Address) -> u64 {
        0
    }

    pub fn set_nonce(&mut self, _addr: &Address, _nonce: u64) {}

    pub fn exists(&self, addr: &Address) -> bool {
        self.state.exists(addr)
    }

    pub fn is_empty(&self, addr: &Address) -> bool {
        !self.state.exists(addr)
    }

    // ---- code ----

    pub fn get_code(&self, addr: &Address) -> Vec<u8> {
        self.state.get_code(addr)
    }

    pub fn get_code_size(&self, addr: &Address) -> usize {
        self.state.get_code(addr).len()
    }

    pub fn get_code_hash(&self, addr: &Address) -> Bytes32 {
        self.state.get_code_hash(addr)
    }

    pub fn set_code(&mut self, addr: &Address, code: Vec<u8>) {
        if !code.is_empty() {
            self.journal
                .put(JournalKey::CreatedContract(*addr), JournalValue::Touched);
        }
        self.state.set_code(addr, code);
    }

    // ---- storage ----

    pub fn get_state(&self, addr: &Address, key: &Bytes32) -> Bytes32 {
        self.state.get_storage(addr, key)
    }

    pub fn set_state(&mut self, addr: &Address, key: &Bytes32, value: Bytes32) {
        self.state.set_storage(addr, key, value);
    }

    pub fn for_each_storage<F>(&self, addr: &Address, mut visit: F)
    where
        F: FnMut(&Bytes32, &Bytes32) -> bool,
    {
        self.state.for_each_storage(addr, &mut visit);
    }

    // ---- self-destruct ----

    /// Deletes the account right away and flags it; both are undone by reverting.
    pub fn suicide(&mut self, addr: &Address) -> bool {
        if !self.state.exists(addr) {
            return false;
        }
        self.state.delete(addr);
        self.journal
            .put(JournalKey::SuicideFlag(*addr), JournalValue::Flag(true));
        true
    }

    /// Only reports the flag; the account itself is already gone from the store.
    pub fn has_suicided(&self, addr: &Address) -> bool {
        match self.lookup(&JournalKey::SuicideFlag(*addr)) {
            JournalValue::Flag(flag) => flag,
            other => panic!("suicide flag holds {:?}", other),
        }
    }

    // ---- refunds, logs, preimages ----

    pub fn get_refund(&self) -> Amount {
        match self.lookup(&JournalKey::Refund) {
            JournalValue::Refund(total) => total,
            other => panic!("refund entry holds {:?}", other),
        }
    }

    pub fn add_refund(&mut self, amount: Amount) {
        let total = self.get_refund().saturating_add(amount);
        self.journal
            .put(JournalKey::Refund, JournalValue::Refund(total));
    }

    pub fn add_log(&mut self, log: Log) {
        self.journal.put(JournalKey::Log, JournalValue::Log(log));
    }

    pub fn add_preimage(&mut self, hash: Bytes32, preimage: Vec<u8>) {
        self.journal
            .put(JournalKey::Preimage(hash), JournalValue::Preimage(preimage));
    }

    // ---- outputs ----

    /// Replays the journal once, routing each entry to its callback in the order it
    /// was written. Any callback returning false ends the walk.
    pub fn get_outputs<L, A, C, P>(
        &self,
        mut log_visit: L,
        mut affected_visit: A,
        mut created_visit: C,
        mut preimage_visit: P,
    ) where
        L: FnMut(&Log) -> bool,
        A: FnMut(&Address) -> bool,
        C: FnMut(&Address) -> bool,
        P: FnMut(&Bytes32, &[u8]) -> bool,
    {
        self.journal.journal(|key, value| match (key, value) {
            (JournalKey::Log, JournalValue::Log(log)) => log_visit(log),
            (JournalKey::AffectedAddress(addr), _) => affected_visit(addr),
            (JournalKey::CreatedContract(addr), _) => created_visit(addr),
            (JournalKey::Preimage(hash), JournalValue::Preimage(bytes)) => {
                preimage_visit(hash, bytes)
            }
            _ => true,
        });
    }

    pub fn collect_outputs(&self) -> Outputs {
        let mut seen_affected = HashSet::new();
        let mut seen_created = HashSet::new();
        let mut logs = Vec::new();
        let mut affected_addresses = Vec::new();
        let mut created_contracts = Vec::new();
        let mut preimages = Vec::new();

        self.get_outputs(
            |log| {
                logs.push(log.clone());
                true
            },
            |addr| {
                if seen_affected.insert(*addr) {
                    affected_addresses.push(*addr);
                }
                true
            },
            |addr| {
                if seen_created.insert(*addr) {
                    created_contracts.push(*addr);
                }
                true
            },
            |hash, bytes| {
                preimages.push((*hash, bytes.to_vec()));
                true
            },
        );

        Outputs {
            logs,
            affected_addresses,
            created_contracts,
            preimages,
        }
    }

    // ---- snapshots ----

    pub fn snapshot(&mut self) -> Revision {
        self.state.new_checkpoint();
        let revision = self.journal.push();
        debug!(revision, "snapshot taken");
        revision
    }

    /// # Panics
    /// If `revision` is beyond the current depth. Nothing is modified in that case.
    pub fn revert_to_snapshot(&mut self, revision: Revision) {
        let depth = self.journal.depth();
        if revision > depth {
            panic!("invalid snapshot revision {} (depth:{})", revision, depth);
        }
        let revert_count = depth - revision;
        for _ in 0..revert_count {
            self.state.revert();
        }
        self.journal.pop_to(revision);
        debug!(revision, revert_count, "reverted to snapshot");
    }

    pub fn depth(&self) -> usize {
        self.journal.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryState;

    fn addr(s: &str) -> Address {
        Address::from_slice_padded(s.as_bytes())
    }

    fn log(tag: u8) -> Log {
        Log::new(addr("emitter"), vec![Bytes32::from_slice_padded(&[tag])], vec![tag])
    }

    fn fresh() -> StateDb<MemoryState> {
        let mut db = StateDb::new(MemoryState::new());
        db.snapshot();
        db
    }

    #[test]
    fn test_zero_amount_is_noop() {
        let mut db = fresh();
        let a = addr("alice");
        db.add_balance(&a, Amount::ZERO);
        db.sub_balance(&a, Amount::ZERO);
        assert!(!db.exists(&a));
        assert!(db.collect_outputs().affected_addresses.is_empty());
    }

    #[test]
    fn test_balance_changes_mark_affected() {
        let mut db = fresh();
        let a = addr("alice");
        db.add_balance(&a, Amount::new(100));
        db.sub_balance(&a, Amount::new(40));
        db.add_balance(&a, Amount::new(1));
        assert_eq!(db.get_balance(&a), Amount::new(61));

        let mut raw = Vec::new();
        db.get_outputs(
            |_| true,
            |x| {
                raw.push(*x);
                true
            },
            |_| true,
            |_, _| true,
        );
        assert_eq!(raw, vec![a, a, a]);
        assert_eq!(db.collect_outputs().affected_addresses, vec![a]);
    }

    #[test]
    fn test_sub_balance_saturates() {
        let mut db = fresh();
        let a = addr("alice");
        db.add_balance(&a, Amount::new(5));
        db.sub_balance(&a, Amount::new(9));
        assert_eq!(db.get_balance(&a), Amount::ZERO);
    }

    #[test]
    fn test_set_code_records_created_contract_only_for_code() {
        let mut db = fresh();
        let a = addr("empty");
        let b = addr("contract");
        db.set_code(&a, Vec::new());
        db.set_code(&b, vec![0x60, 0x80]);
        assert_eq!(db.get_code_size(&b), 2);
        assert_eq!(db.collect_outputs().created_contracts, vec![b]);
    }

    #[test]
    fn test_suicide() {
        let mut db = fresh();
        let a = addr("victim");
        assert!(!db.suicide(&a));
        assert!(!db.has_suicided(&a));

        db.add_balance(&a, Amount::new(1));
        assert!(db.suicide(&a));
        assert!(db.has_suicided(&a));
        assert!(!db.exists(&a));
        assert!(db.is_empty(&a));
    }

    #[test]
    fn test_refunds_accumulate() {
        let mut db = fresh();
        assert_eq!(db.get_refund(), Amount::ZERO);
        db.add_refund(Amount::new(10));
        db.add_refund(Amount::new(5));
        assert_eq!(db.get_refund(), Amount::new(15));
    }

    #[test]
    fn test_refund_reverts_with_snapshot() {
        let mut db = fresh();
        db.add_refund(Amount::new(10));
        let rev = db.snapshot();
        db.add_refund(Amount::new(7));
        db.revert_to_snapshot(rev);
        assert_eq!(db.get_refund(), Amount::new(10));
    }

    #[test]
    fn test_outputs_in_write_order() {
        let mut db = fresh();
        let hash = Bytes32::from_slice_padded(&[0xaa]);
        db.add_log(log(1));
        db.add_preimage(hash, vec![1, 2, 3]);
        db.add_log(log(2));
        db.add_refund(Amount::new(3));

        let outputs = db.collect_outputs();
        assert_eq!(outputs.logs, vec![log(1), log(2)]);
        assert_eq!(outputs.preimages, vec![(hash, vec![1, 2, 3])]);
    }

    #[test]
    fn test_get_outputs_stops_when_callback_declines() {
        let mut db = fresh();
        db.add_log(log(1));
        db.add_balance(&addr("alice"), Amount::new(1));
        db.add_log(log(2));

        let mut logs = 0;
        let mut affected = 0;
        db.get_outputs(
            |_| {
                logs += 1;
                true
            },
            |_| {
                affected += 1;
                false
            },
            |_| true,
            |_, _| true,
        );
        assert_eq!(logs, 1);
        assert_eq!(affected, 1);
    }

    #[test]
    fn test_stubs() {
        let mut db = fresh();
        let a = addr("alice");
        db.create_account(&a);
        db.set_nonce(&a, 9);
        assert_eq!(db.get_nonce(&a), 0);
        assert!(!db.exists(&a));
    }

    #[test]
    #[should_panic(expected = "invalid snapshot revision 5 (depth:1)")]
    fn test_revert_beyond_depth_panics() {
        let mut db = fresh();
        db.revert_to_snapshot(5);
    }

    #[test]
    #[should_panic(expected = "journal put with no layer pushed")]
    fn test_journal_write_before_snapshot_panics() {
        let mut db = StateDb::new(MemoryState::new());
        db.add_log(log(1));
    }
}
