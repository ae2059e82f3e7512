mod end_to_end;
mod run_command;
