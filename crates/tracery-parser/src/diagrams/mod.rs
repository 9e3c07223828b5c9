//! Command grammars of the supported diagram families.

mod class;
mod component;
mod ebnf;
mod link;
mod sequence;
mod timing;

pub use class::ClassFactory;
pub use component::ComponentFactory;
pub use ebnf::{EbnfFactory, parse_ebnf_expr};
pub use sequence::SequenceFactory;
pub use timing::TimingFactory;

use crate::factory::AnyFactory;

/// Every factory, in the order they are tried on a block.
pub fn factories() -> Vec<Box<dyn AnyFactory>> {
    vec![
        Box::new(SequenceFactory::new()),
        Box::new(TimingFactory::new()),
        Box::new(ClassFactory::new()),
        Box::new(ComponentFactory::new()),
        Box::new(EbnfFactory::new()),
    ]
}
