use ts_rs::TS;

fn main() {
    let decls = [
        db::EntityKind::decl(),
        db::models::workspace::Workspace::decl(),
        db::models::workspace::WorkspaceWithBoards::decl(),
        db::models::workspace::CreateWorkspace::decl(),
        db::models::workspace::UpdateWorkspace::decl(),
        db::models::board::Board::decl(),
        db::models::board::CreateBoard::decl(),
        db::models::board::UpdateBoard::decl(),
        db::models::column::Column::decl(),
        db::models::column::CreateColumn::decl(),
        db::models::column::UpdateColumn::decl(),
        db::models::task::Task::decl(),
        db::models::task::CreateTask::decl(),
        db::models::task::UpdateTask::decl(),
        utils_core::response::ApiResponse::<()>::decl(),
    ];

    println!("// This file was generated by `generate_types`. Do not edit.\n");
    for decl in decls {
        println!("export {decl}\n");
    }
}
