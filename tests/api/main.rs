mod health_check;
mod helpers;
mod scanner;
mod startup;
mod webhook;
