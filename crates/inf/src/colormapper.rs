mod categoric;

pub(crate) use categoric::CategoricNumeric;
