mod energy;
mod interaction;
mod migration;
mod recharge;
mod spawn;
