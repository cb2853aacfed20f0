mod aided;
mod coast;
