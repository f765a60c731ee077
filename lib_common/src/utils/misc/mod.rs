/// Identity of the running process (executable, PID, host).
pub mod sys_info;
