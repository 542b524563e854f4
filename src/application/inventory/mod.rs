// 蔵書サービス - 在庫の唯一の書き手
//
// 借用・返却要求をキューから取り込み、在庫を更新し、応答を発行する。
// 在庫切れへの借用は予約待ちリストへ、返却時はドレインして通知する。

mod mutator;
mod waiting_list;
mod worker;

#[allow(unused_imports)]
pub use mutator::{
    BorrowFailure, InventoryDependencies, ReturnFailure, process_borrow_request,
    process_return_request,
};
#[allow(unused_imports)]
pub use waiting_list::{DrainError, drain_and_notify};
#[allow(unused_imports)]
pub use worker::{run_borrow_request_worker, run_return_request_worker};
