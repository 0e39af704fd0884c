use super::State;
use crate::crypto::keccak256;
use crate::types::{Address, Amount, Bytes32};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Account {
    balance: Amount,
    code: Vec<u8>,
    storage: BTreeMap<Bytes32, Bytes32>,
}

impl Default for Account {
    fn default() -> Self {
        Account {
            balance: Amount::ZERO,
            code: Vec::new(),
            storage: BTreeMap::new(),
        }
    }
}

/// In-memory account store with stacked checkpoints.
///
/// Each checkpoint keeps the pre-checkpoint value of every account touched
/// while it is open, so reverting is a matter of putting those back.
#[derive(Debug, Default)]
pub struct MemoryState {
    accounts: HashMap<Address, Account>,
    checkpoints: Vec<HashMap<Address, Option<Account>>>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open checkpoints.
    pub fn checkpoint_depth(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn touch(&mut self, addr: &Address) {
        if let Some(frame) = self.checkpoints.last_mut() {
            if !frame.contains_key(addr) {
                frame.insert(*addr, self.accounts.get(addr).cloned());
            }
        }
    }

    fn account_mut(&mut self, addr: &Address) -> &mut Account {
        self.touch(addr);
        self.accounts.entry(*addr).or_default()
    }
}

impl State for MemoryState {
    fn get_balance(&self, addr: &Address) -> Amount {
        self.accounts
            .get(addr)
            .map(|a| a.balance)
            .unwrap_or(Amount::ZERO)
    }

    fn set_balance(&mut self, addr: &Address, balance: Amount) {
        self.account_mut(addr).balance = balance;
    }

    fn get_code(&self, addr: &Address) -> Vec<u8> {
        self.accounts
            .get(addr)
            .map(|a| a.code.clone())
            .unwrap_or_default()
    }

    fn get_code_hash(&self, addr: &Address) -> Bytes32 {
        match self.accounts.get(addr) {
            Some(account) if !account.code.is_empty() => keccak256(&account.code),
            _ => Bytes32::ZERO,
        }
    }

    fn set_code(&mut self, addr: &Address, code: Vec<u8>) {
        self.account_mut(addr).code = code;
    }

    fn get_storage(&self, addr: &Address, key: &Bytes32) -> Bytes32 {
        self.accounts
            .get(addr)
            .and_then(|a| a.storage.get(key).copied())
            .unwrap_or_default()
    }

    fn set_storage(&mut self, addr: &Address, key: &Bytes32, value: Bytes32) {
        let account = self.account_mut(addr);
        if value.is_zero() {
            account.storage.remove(key);
        } else {
            account.storage.insert(*key, value);
        }
    }

    fn for_each_storage(&self, addr: &Address, visit: &mut dyn FnMut(&Bytes32, &Bytes32) -> bool) {
        if let Some(account) = self.accounts.get(addr) {
            for (key, value) in &account.storage {
                if !visit(key, value) {
                    return;
                }
            }
        }
    }

    fn exists(&self, addr: &Address) -> bool {
        self.accounts.contains_key(addr)
    }

    fn delete(&mut self, addr: &Address) {
        self.touch(addr);
        self.accounts.remove(addr);
    }

    fn new_checkpoint(&mut self) {
        self.checkpoints.push(HashMap::new());
    }

    fn revert(&mut self) {
        let frame = match self.checkpoints.pop() {
            Some(frame) => frame,
            None => panic!("state revert with no open checkpoint"),
        };
        for (addr, previous) in frame {
            match previous {
                Some(account) => {
                    self.accounts.insert(addr, account);
                }
                None => {
                    self.accounts.remove(&addr);
                }
            }
        }
    }
}
