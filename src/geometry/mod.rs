pub use self::cell_lists::CellAtomLists;
pub use self::charge_brick::ChargeBrick;

mod cell_lists;
mod charge_brick;
