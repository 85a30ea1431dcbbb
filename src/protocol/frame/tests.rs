mod assembler;
