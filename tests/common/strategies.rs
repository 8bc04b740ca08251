use super::fixtures::{Notify, Numbered};
use proptest::prelude::*;
use signal_dispatch::{FanOutStrategy, HandlerType, TypeUniverse};

/// Number of distinct `Numbered` handlers the fixtures register.
pub const NUMBERED_HANDLERS: usize = 8;

/// A non-empty ordered selection of distinct numbered handlers.
pub fn handler_order_strategy() -> impl Strategy<Value = Vec<usize>> {
    (
        Just((0..NUMBERED_HANDLERS).collect::<Vec<_>>()).prop_shuffle(),
        1..=NUMBERED_HANDLERS,
    )
        .prop_map(|(order, len)| order[..len].to_vec())
}

pub fn fan_out_strategy() -> impl Strategy<Value = FanOutStrategy> {
    prop_oneof![
        Just(FanOutStrategy::Sequential),
        Just(FanOutStrategy::Concurrent),
    ]
}

/// Split `order` across `universes` consecutive universes, keeping the order.
pub fn numbered_universes(order: &[usize], universes: usize) -> Vec<TypeUniverse> {
    let chunk = order.len().div_ceil(universes.max(1)).max(1);
    order
        .chunks(chunk)
        .enumerate()
        .map(|(index, chunk)| {
            chunk.iter().fold(
                TypeUniverse::new(format!("numbered-{index}")).signal::<Notify>(),
                |universe, &n| register_numbered(universe, n),
            )
        })
        .collect()
}

pub fn register_numbered(universe: TypeUniverse, n: usize) -> TypeUniverse {
    match n {
        0 => universe.handler(HandlerType::<Numbered<0>>::new().answers::<Notify>()),
        1 => universe.handler(HandlerType::<Numbered<1>>::new().answers::<Notify>()),
        2 => universe.handler(HandlerType::<Numbered<2>>::new().answers::<Notify>()),
        3 => universe.handler(HandlerType::<Numbered<3>>::new().answers::<Notify>()),
        4 => universe.handler(HandlerType::<Numbered<4>>::new().answers::<Notify>()),
        5 => universe.handler(HandlerType::<Numbered<5>>::new().answers::<Notify>()),
        6 => universe.handler(HandlerType::<Numbered<6>>::new().answers::<Notify>()),
        7 => universe.handler(HandlerType::<Numbered<7>>::new().answers::<Notify>()),
        other => panic!("no numbered handler {other}"),
    }
}
