mod dispatcher;

pub(crate) use dispatcher::Dispatcher;
