pub mod netwatch_poll;
