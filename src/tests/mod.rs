mod common;
mod test_select;
