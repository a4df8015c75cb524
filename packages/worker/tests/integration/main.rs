mod judge;
mod sandbox;
mod support;
