//! Account store contract consumed by the execution state, plus an in-memory store.

pub mod memory;

pub use memory::MemoryState;

use crate::types::{Address, Amount, Bytes32};

/// Persistent account store.
///
/// Balance, code and storage writes take effect immediately; `new_checkpoint` and
/// `revert` form a stack that undoes them. Implementations latch their own I/O
/// errors, so none of these calls fail.
pub trait State {
    fn get_balance(&self, addr: &Address) -> Amount;
    fn set_balance(&mut self, addr: &Address, balance: Amount);

    fn get_code(&self, addr: &Address) -> Vec<u8>;
    fn get_code_hash(&self, addr: &Address) -> Bytes32;
    fn set_code(&mut self, addr: &Address, code: Vec<u8>);

    fn get_storage(&self, addr: &Address, key: &Bytes32) -> Bytes32;
    fn set_storage(&mut self, addr: &Address, key: &Bytes32, value: Bytes32);
    /// Visits storage slots of `addr` until `visit` returns false.
    fn for_each_storage(&self, addr: &Address, visit: &mut dyn FnMut(&Bytes32, &Bytes32) -> bool);

    fn exists(&self, addr: &Address) -> bool;
    fn delete(&mut self, addr: &Address);

    fn new_checkpoint(&mut self);
    /// Undoes every write since the most recent open checkpoint and closes it.
    fn revert(&mut self);
}

impl<S: State + ?Sized> State for &mut S {
    fn get_balance(&self, addr: &Address) -> Amount {
        (**self).get_balance(addr)
    }

    fn set_balance(&mut self, addr: &Address, balance: Amount) {
        (**self).set_balance(addr, balance)
    }

    fn get_code(&self, addr: &Address) -> Vec<u8> {
        (**self).get_code(addr)
    }

    fn get_code_hash(&self, addr: &Address) -> Bytes32 {
        (**self).get_code_hash(addr)
    }

    fn set_code(&mut self, addr: &Address, code: Vec<u8>) {
        (**self).set_code(addr, code)
    }

    fn get_storage(&self, addr: &Address, key: &Bytes32) -> Bytes32 {
        (**self).get_storage(addr, key)
    }

    fn set_storage(&mut self, addr: &Address, key: &Bytes32, value: Bytes32) {
        (**self).set_storage(addr, key, value)
    }

    fn for_each_storage(&self, addr: &Address, visit: &mut dyn FnMut(&Bytes32, &Bytes32) -> bool) {
        (**self).for_each_storage(addr, visit)
    }

    fn exists(&self, addr: &Address) -> bool {
        (**self).exists(addr)
    }

    fn delete(&mut self, addr: &Address) {
        (**self).delete(addr)
    }

    fn new_checkpoint(&mut self) {
        (**self).new_checkpoint()
    }

    fn revert(&mut self) {
        (**self).revert()
    }
}
