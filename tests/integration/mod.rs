mod helpers;
mod test_select;
mod test_testplan;
